//! The wire format spoken with the sandboxed verifier.

mod codec;
mod message;

pub mod types;

pub use codec::Codec;
pub use message::Message;
