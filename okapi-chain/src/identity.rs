//! Ledger identities.

use std::{fmt, io};

use crate::serialization::{
    okapi_serialize_bytes, OkapiDeserialize, OkapiSerialize, SerializationError,
    TrustedPreallocate, MAX_PROTOCOL_MESSAGE_LEN,
};

/// An encoded public key owning states on the ledger.
///
/// The key encoding is scheme-dependent and opaque here; keys are compared
/// and looked up as exact byte strings.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PartyKey(pub Vec<u8>);

impl PartyKey {
    /// The encoded key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PartyKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("PartyKey")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl OkapiSerialize for PartyKey {
    fn okapi_serialize<W: io::Write>(&self, writer: W) -> Result<(), io::Error> {
        okapi_serialize_bytes(&self.0, writer)
    }
}

impl OkapiDeserialize for PartyKey {
    fn okapi_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Self(Vec::okapi_deserialize(reader)?))
    }
}

impl TrustedPreallocate for PartyKey {
    fn max_allocation() -> u64 {
        // An honest encoded key takes at least 32 bytes plus a length prefix.
        (MAX_PROTOCOL_MESSAGE_LEN as u64) / 33
    }
}

/// A named ledger identity and its owning key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Party {
    /// The identity's display name.
    pub name: String,
    /// The public key that owns states for this identity.
    pub owning_key: PartyKey,
}

impl OkapiSerialize for Party {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.name.okapi_serialize(&mut writer)?;
        self.owning_key.okapi_serialize(&mut writer)
    }
}

impl OkapiDeserialize for Party {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Party {
            name: String::okapi_deserialize(&mut reader)?,
            owning_key: PartyKey::okapi_deserialize(&mut reader)?,
        })
    }
}

impl TrustedPreallocate for Party {
    fn max_allocation() -> u64 {
        // A party is at least a name length prefix plus an encoded key.
        PartyKey::max_allocation()
    }
}
