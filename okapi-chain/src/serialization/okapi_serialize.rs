use std::{
    collections::{BTreeMap, BTreeSet},
    io,
};

use super::WriteOkapiExt;

/// Canonical serialization for the Okapi verifier wire format.
///
/// This trait provides a generic serialization for wire-critical formats,
/// such as verifier protocol messages and the ledger types they carry. It is
/// intended for use only in wire-critical contexts; in other contexts, such
/// as internal storage or configuration, it would be preferable to use Serde.
pub trait OkapiSerialize: Sized {
    /// Write `self` to the given `writer` using the canonical format.
    ///
    /// This function has an `okapi_` prefix to alert the reader that the
    /// serialization in use is wire-critical serialization, rather than some
    /// other kind of serialization.
    ///
    /// Notice that the error type is [`std::io::Error`]; this indicates that
    /// serialization MUST be infallible up to errors in the underlying
    /// writer. In other words, any type implementing `OkapiSerialize` must
    /// make illegal states unrepresentable.
    fn okapi_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error>;

    /// Helper function to construct a vec to serialize the current struct into
    fn okapi_serialize_to_vec(&self) -> Result<Vec<u8>, io::Error> {
        let mut data = Vec::new();
        self.okapi_serialize(&mut data)?;
        Ok(data)
    }
}

/// Serialize a `Vec` as a compactsize number of items, then the items. This
/// is the most common collection format on the wire.
///
/// See `okapi_serialize_external_count` for more details, and usage
/// information.
impl<T: OkapiSerialize> OkapiSerialize for Vec<T> {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.len() as u64)?;
        okapi_serialize_external_count(self, writer)
    }
}

/// Serialize a byte vector as a compactsize number of bytes, then the bytes.
///
/// See `okapi_serialize_bytes_external_count` for more details, and usage
/// information.
//
// we specifically want to serialize `Vec`s here, rather than generic slices
#[allow(clippy::ptr_arg)]
pub fn okapi_serialize_bytes<W: io::Write>(vec: &Vec<u8>, mut writer: W) -> Result<(), io::Error> {
    writer.write_compactsize(vec.len() as u64)?;
    okapi_serialize_bytes_external_count(vec, writer)
}

/// Serialize a typed `Vec` **without** writing the number of items as a
/// compactsize.
///
/// ## Usage
///
/// Use `okapi_serialize_external_count` when the array count is determined
/// by other data, or a protocol rule.
///
/// Use `Vec::okapi_serialize` for data that contains a compactsize count,
/// followed by the data array.
//
// we specifically want to serialize `Vec`s here, rather than generic slices
#[allow(clippy::ptr_arg)]
pub fn okapi_serialize_external_count<W: io::Write, T: OkapiSerialize>(
    vec: &Vec<T>,
    mut writer: W,
) -> Result<(), io::Error> {
    for x in vec {
        x.okapi_serialize(&mut writer)?;
    }
    Ok(())
}

/// Serialize a raw byte `Vec` **without** writing the number of items as a
/// compactsize.
///
/// This is a convenience alias for `writer.write_all(&vec)`.
//
// we specifically want to serialize `Vec`s here, rather than generic slices
#[allow(clippy::ptr_arg)]
pub fn okapi_serialize_bytes_external_count<W: io::Write>(
    vec: &Vec<u8>,
    mut writer: W,
) -> Result<(), io::Error> {
    writer.write_all(vec)
}

/// Write a compactsize-prefixed UTF-8 `&str`.
impl OkapiSerialize for &str {
    fn okapi_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        let str_bytes = self.as_bytes().to_vec();
        okapi_serialize_bytes(&str_bytes, writer)
    }
}

/// Write a compactsize-prefixed UTF-8 `String`.
impl OkapiSerialize for String {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.as_str().okapi_serialize(&mut writer)
    }
}

/// Write a `bool` as a single `0x00`/`0x01` byte.
impl OkapiSerialize for bool {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&[*self as u8])
    }
}

/// Write an `Option` as a presence byte, then the value if there is one.
///
/// The verifier protocol is nullable-heavy: lookups that miss yield absent
/// values, never errors, so `Option` gets a canonical encoding of its own.
impl<T: OkapiSerialize> OkapiSerialize for Option<T> {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            None => writer.write_all(&[0x00]),
            Some(inner) => {
                writer.write_all(&[0x01])?;
                inner.okapi_serialize(&mut writer)
            }
        }
    }
}

/// Write a `BTreeSet` as a compactsize number of items, then the items in
/// ascending order.
impl<T: OkapiSerialize + Ord> OkapiSerialize for BTreeSet<T> {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.len() as u64)?;
        for x in self {
            x.okapi_serialize(&mut writer)?;
        }
        Ok(())
    }
}

/// Write a `BTreeMap` as a compactsize number of entries, then the
/// `key, value` pairs in ascending key order.
impl<K: OkapiSerialize + Ord, V: OkapiSerialize> OkapiSerialize for BTreeMap<K, V> {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_compactsize(self.len() as u64)?;
        for (k, v) in self {
            k.okapi_serialize(&mut writer)?;
            v.okapi_serialize(&mut writer)?;
        }
        Ok(())
    }
}

/// The maximum length of an Okapi verifier protocol message, in bytes.
///
/// Verification requests carry a whole transaction together with its
/// resolved input states, and attachment responses carry whole attachment
/// archives, so this limit is far larger than a typical peer-to-peer
/// message limit. It is also used to calculate safe preallocation limits
/// for some types.
pub const MAX_PROTOCOL_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// A fake writer helper used to calculate the serialized size of a message.
pub struct FakeWriter(pub usize);

impl std::io::Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}
