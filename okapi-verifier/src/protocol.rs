//! Okapi verifier protocol definitions.
//!
//! [`external`] is the framed wire format spoken between the node and the
//! sandboxed verifier process. [`internal`] is the in-process request type
//! answered by the node's data-support facade while a verification is in
//! flight.

pub mod external;
pub mod internal;
