//! Transaction identifiers and opaque transaction payloads.

use std::{fmt, io};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::serialization::{
    okapi_serialize_bytes, sha256d, OkapiDeserialize, OkapiSerialize, ReadOkapiExt,
    SerializationError, WriteOkapiExt,
};

/// A transaction hash.
///
/// Computed as the SHA256d digest of the canonical serialized transaction.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Compute the hash of a serialized transaction payload.
    pub fn compute(bytes: &[u8]) -> Self {
        use io::Write;

        let mut writer = sha256d::Writer::default();
        writer
            .write_all(bytes)
            .expect("writing to a hasher never fails");
        Self(writer.finish())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("transaction::Hash")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl std::str::FromStr for Hash {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        if hex::decode_to_slice(s, &mut bytes[..]).is_err() {
            Err(SerializationError::Parse("hex decoding error"))
        } else {
            Ok(Hash(bytes))
        }
    }
}

impl OkapiSerialize for Hash {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_32_bytes(&self.0)
    }
}

impl OkapiDeserialize for Hash {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Hash(reader.read_32_bytes()?))
    }
}

/// A reference to an output state of a previous transaction.
///
/// State references order by transaction hash, then output index, so they can
/// key the dependency map attached to a verification request.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct StateRef {
    /// The hash of the transaction that produced the state.
    pub hash: Hash,
    /// The index of the state in that transaction's outputs.
    pub index: u32,
}

impl OkapiSerialize for StateRef {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.hash.okapi_serialize(&mut writer)?;
        writer.write_u32::<LittleEndian>(self.index)
    }
}

impl OkapiDeserialize for StateRef {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(StateRef {
            hash: Hash::okapi_deserialize(&mut reader)?,
            index: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// An opaque signed-transaction payload.
///
/// The interior encoding belongs to the ledger's own transaction format; this
/// type carries it across the verifier wire as an exact byte string.
#[derive(Clone, Eq, PartialEq)]
pub struct SerializedTransaction(pub Vec<u8>);

impl SerializedTransaction {
    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The hash of this payload.
    pub fn hash(&self) -> Hash {
        Hash::compute(&self.0)
    }
}

impl From<Vec<u8>> for SerializedTransaction {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SerializedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SerializedTransaction")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl OkapiSerialize for SerializedTransaction {
    fn okapi_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        okapi_serialize_bytes(&self.0, writer)
    }
}

impl OkapiDeserialize for SerializedTransaction {
    fn okapi_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Self(Vec::okapi_deserialize(reader)?))
    }
}

/// An opaque serialized output state.
///
/// States resolved from previous transactions travel with a verification
/// request in this form, keyed by their [`StateRef`].
#[derive(Clone, Eq, PartialEq)]
pub struct SerializedState(pub Vec<u8>);

impl SerializedState {
    /// The raw state bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SerializedState {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for SerializedState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SerializedState")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl OkapiSerialize for SerializedState {
    fn okapi_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        okapi_serialize_bytes(&self.0, writer)
    }
}

impl OkapiDeserialize for SerializedState {
    fn okapi_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Self(Vec::okapi_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use super::*;
    use crate::serialization::OkapiDeserializeInto;

    #[test]
    fn hash_display_parse_roundtrip() {
        let hash = Hash::compute(b"a transaction");
        let parsed: Hash = hash.to_string().parse().expect("valid hex");
        assert_eq!(hash, parsed);
    }

    #[test]
    fn state_refs_order_by_hash_then_index() {
        let low = StateRef {
            hash: Hash([0x00; 32]),
            index: 7,
        };
        let high = StateRef {
            hash: Hash([0x01; 32]),
            index: 0,
        };
        assert!(low < high);
        assert!(low < StateRef { index: 8, ..low });
    }

    #[test]
    fn state_map_roundtrip() {
        let mut states = BTreeMap::new();
        states.insert(
            StateRef {
                hash: Hash::compute(b"parent"),
                index: 0,
            },
            SerializedState(vec![1, 2, 3]),
        );
        states.insert(
            StateRef {
                hash: Hash::compute(b"parent"),
                index: 1,
            },
            SerializedState(vec![]),
        );

        let bytes = states.okapi_serialize_to_vec().expect("vec write");
        let back: BTreeMap<StateRef, SerializedState> =
            Cursor::new(bytes).okapi_deserialize_into().expect("roundtrip");
        assert_eq!(states, back);
    }
}
