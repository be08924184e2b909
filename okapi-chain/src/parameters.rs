//! Network-wide parameters.

use std::{fmt, io};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::serialization::{
    sha256d, OkapiDeserialize, OkapiSerialize, ReadOkapiExt, SerializationError, WriteOkapiExt,
    MAX_PROTOCOL_MESSAGE_LEN,
};

/// The hash identifying a network parameters snapshot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Compute the hash of a canonically serialized parameters snapshot.
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
        f.debug_tuple("parameters::Hash")
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

/// A snapshot of the parameters every participant on the network agrees on.
///
/// Transactions are verified against a specific snapshot, identified by its
/// [`Hash`]; the external verifier asks the node for snapshots it has not
/// seen before.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    /// The monotonically increasing version of this snapshot.
    pub epoch: u32,
    /// The minimum platform version participants must run.
    pub min_platform_version: u32,
    /// The maximum size of a network message, in bytes.
    pub max_message_size: u32,
    /// The maximum size of a serialized transaction, in bytes.
    pub max_transaction_size: u32,
}

impl NetworkParameters {
    /// The hash identifying this snapshot.
    pub fn hash(&self) -> Hash {
        let bytes = self
            .okapi_serialize_to_vec()
            .expect("serializing fixed-width fields never fails");
        Hash::compute(&bytes)
    }
}

impl Default for NetworkParameters {
    fn default() -> Self {
        NetworkParameters {
            epoch: 1,
            min_platform_version: 1,
            max_message_size: MAX_PROTOCOL_MESSAGE_LEN as u32,
            max_transaction_size: 10 * 1024 * 1024,
        }
    }
}

impl OkapiSerialize for NetworkParameters {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_u32::<LittleEndian>(self.epoch)?;
        writer.write_u32::<LittleEndian>(self.min_platform_version)?;
        writer.write_u32::<LittleEndian>(self.max_message_size)?;
        writer.write_u32::<LittleEndian>(self.max_transaction_size)
    }
}

impl OkapiDeserialize for NetworkParameters {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(NetworkParameters {
            epoch: reader.read_u32::<LittleEndian>()?,
            min_platform_version: reader.read_u32::<LittleEndian>()?,
            max_message_size: reader.read_u32::<LittleEndian>()?,
            max_transaction_size: reader.read_u32::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_hash_changes_with_epoch() {
        let params = NetworkParameters::default();
        let bumped = NetworkParameters {
            epoch: params.epoch + 1,
            ..params
        };

        assert_eq!(params.hash(), params.hash());
        assert_ne!(params.hash(), bumped.hash());
    }
}
