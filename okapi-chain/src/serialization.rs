//! Canonical wire serialization.
//!
//! This module contains four traits: `OkapiSerialize` and `OkapiDeserialize`,
//! analogs of the Serde `Serialize` and `Deserialize` traits but intended for
//! the canonical verifier wire format, and `WriteOkapiExt` and `ReadOkapiExt`,
//! extension traits for `io::Read` and `io::Write` with utility functions
//! for reading and writing data (e.g., the variable-length integer format).

mod error;
mod okapi_deserialize;
mod okapi_serialize;
mod read_okapi;
mod write_okapi;

pub mod sha256d;


pub use error::SerializationError;
pub use okapi_deserialize::{
    okapi_deserialize_bytes_external_count, okapi_deserialize_external_count, OkapiDeserialize,
    OkapiDeserializeInto, TrustedPreallocate,
};
pub use okapi_serialize::{
    okapi_serialize_bytes, okapi_serialize_bytes_external_count, okapi_serialize_external_count,
    FakeWriter, OkapiSerialize, MAX_PROTOCOL_MESSAGE_LEN,
};
pub use read_okapi::ReadOkapiExt;
pub use write_okapi::WriteOkapiExt;
