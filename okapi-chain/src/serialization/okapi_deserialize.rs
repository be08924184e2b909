use std::{
    collections::{BTreeMap, BTreeSet},
    convert::{TryFrom, TryInto},
    io,
};

use super::{ReadOkapiExt, SerializationError, MAX_PROTOCOL_MESSAGE_LEN};

/// Canonical deserialization for the Okapi verifier wire format.
///
/// This trait provides a generic deserialization for wire-critical formats,
/// such as verifier protocol messages and the ledger types they carry. It is
/// intended for use only in wire-critical contexts; in other contexts, such
/// as internal storage or configuration, it would be preferable to use Serde.
pub trait OkapiDeserialize: Sized {
    /// Try to read `self` from the given `reader`.
    ///
    /// This function has an `okapi_` prefix to alert the reader that the
    /// serialization in use is wire-critical serialization, rather than some
    /// other kind of serialization.
    fn okapi_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError>;
}

/// Deserialize a `Vec`, where the number of items is set by a compactsize
/// prefix in the data. This is the most common collection format on the
/// wire.
///
/// See `okapi_deserialize_external_count` for more details, and usage
/// information.
impl<T: OkapiDeserialize + TrustedPreallocate> OkapiDeserialize for Vec<T> {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?.try_into()?;
        okapi_deserialize_external_count(len, reader)
    }
}

/// Implement OkapiDeserialize for Vec<u8> directly instead of using the
/// blanket Vec implementation
///
/// This allows us to optimize the inner loop into a single call to
/// `read_exact()`. Note that we don't implement TrustedPreallocate for u8.
/// This allows the optimization without relying on specialization.
impl OkapiDeserialize for Vec<u8> {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?.try_into()?;
        okapi_deserialize_bytes_external_count(len, reader)
    }
}

/// Deserialize a `Vec` containing `external_count` items.
///
/// Use `okapi_deserialize_external_count` when the array count is determined
/// by other data, or a protocol rule. Use `Vec::okapi_deserialize` for data
/// that contains a compactsize count, followed by the data array.
pub fn okapi_deserialize_external_count<R: io::Read, T: OkapiDeserialize + TrustedPreallocate>(
    external_count: usize,
    mut reader: R,
) -> Result<Vec<T>, SerializationError> {
    match u64::try_from(external_count) {
        Ok(external_count) if external_count > T::max_allocation() => {
            return Err(SerializationError::Parse(
                "Vector longer than max_allocation",
            ))
        }
        Ok(_) => {}
        // As of 2021, usize is less than or equal to 64 bits on all (or almost all?)
        // supported Rust platforms. So in practice this error is impossible. (But the
        // check is required, because Rust is future-proof for 128 bit memory spaces.)
        Err(_) => return Err(SerializationError::Parse("Vector longer than u64::MAX")),
    }
    let mut vec = Vec::with_capacity(external_count);
    for _ in 0..external_count {
        vec.push(T::okapi_deserialize(&mut reader)?);
    }
    Ok(vec)
}

/// `okapi_deserialize_external_count`, specialised for raw bytes.
///
/// This allows us to optimize the inner loop into a single call to
/// `read_exact()`.
pub fn okapi_deserialize_bytes_external_count<R: io::Read>(
    external_count: usize,
    mut reader: R,
) -> Result<Vec<u8>, SerializationError> {
    if external_count > MAX_U8_ALLOCATION {
        return Err(SerializationError::Parse(
            "Byte vector longer than MAX_U8_ALLOCATION",
        ));
    }
    let mut vec = vec![0u8; external_count];
    reader.read_exact(&mut vec)?;
    Ok(vec)
}

/// Read a compactsize-prefixed UTF-8 string.
impl OkapiDeserialize for String {
    fn okapi_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let bytes: Vec<_> = Vec::okapi_deserialize(reader)?;
        String::from_utf8(bytes).map_err(|_| SerializationError::Parse("invalid utf-8"))
    }
}

/// Read a `bool` from a single strict `0x00`/`0x01` byte.
impl OkapiDeserialize for bool {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        match byte[0] {
            0x00 => Ok(false),
            0x01 => Ok(true),
            _ => Err(SerializationError::Parse("non-canonical bool")),
        }
    }
}

/// Read an `Option` from a strict presence byte, then the value if present.
impl<T: OkapiDeserialize> OkapiDeserialize for Option<T> {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        if bool::okapi_deserialize(&mut reader)? {
            Ok(Some(T::okapi_deserialize(&mut reader)?))
        } else {
            Ok(None)
        }
    }
}

/// Read a `BTreeSet` from a compactsize count, then that many items.
///
/// Duplicate items are rejected as non-canonical. `BTreeSet` insertion does
/// not preallocate, so no `TrustedPreallocate` bound is needed; the count is
/// still capped by the compactsize message-length guard.
impl<T: OkapiDeserialize + Ord> OkapiDeserialize for BTreeSet<T> {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?;
        let mut set = BTreeSet::new();
        for _ in 0..len {
            if !set.insert(T::okapi_deserialize(&mut reader)?) {
                return Err(SerializationError::Parse("duplicate item in serialized set"));
            }
        }
        Ok(set)
    }
}

/// Read a `BTreeMap` from a compactsize entry count, then that many
/// `key, value` pairs.
///
/// Duplicate keys are rejected as non-canonical.
impl<K: OkapiDeserialize + Ord, V: OkapiDeserialize> OkapiDeserialize for BTreeMap<K, V> {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let len = reader.read_compactsize()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::okapi_deserialize(&mut reader)?;
            let value = V::okapi_deserialize(&mut reader)?;
            if map.insert(key, value).is_some() {
                return Err(SerializationError::Parse("duplicate key in serialized map"));
            }
        }
        Ok(map)
    }
}

/// Helper for deserializing more succinctly via type inference
pub trait OkapiDeserializeInto {
    /// Deserialize based on type inference
    fn okapi_deserialize_into<T>(self) -> Result<T, SerializationError>
    where
        T: OkapiDeserialize;
}

impl<R: io::Read> OkapiDeserializeInto for R {
    fn okapi_deserialize_into<T>(self) -> Result<T, SerializationError>
    where
        T: OkapiDeserialize,
    {
        T::okapi_deserialize(self)
    }
}

/// Blind preallocation of a Vec<T: TrustedPreallocate> is based on a bounded
/// length. This is in contrast to blind preallocation of a generic Vec<T>,
/// which is a DOS vector.
///
/// The max_allocation() function provides a loose upper bound on the size of
/// the Vec<T: TrustedPreallocate> which can possibly be received from an
/// honest sender. If this limit is too low, valid messages will be rejected.
pub trait TrustedPreallocate {
    /// Provides a ***loose upper bound*** on the size of the
    /// Vec<T: TrustedPreallocate> which can possibly be received from an
    /// honest sender.
    fn max_allocation() -> u64;
}

/// An absent `Option` takes one byte, so the loose count bound for a vector
/// of `Option`s is the message length itself, whatever the inner type.
impl<T: TrustedPreallocate> TrustedPreallocate for Option<T> {
    fn max_allocation() -> u64 {
        MAX_PROTOCOL_MESSAGE_LEN as u64
    }
}

/// The length of the longest valid `Vec<u8>` that can be received over the
/// wire.
///
/// It takes 5 bytes to encode a compactsize representing any number between
/// 2^16 and (2^32 - 1), so the largest `Vec<u8>` that can be received from an
/// honest sender is (MAX_PROTOCOL_MESSAGE_LEN - 5).
pub(crate) const MAX_U8_ALLOCATION: usize = MAX_PROTOCOL_MESSAGE_LEN - 5;
