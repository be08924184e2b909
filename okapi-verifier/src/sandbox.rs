//! Launching the sandboxed verifier process, and the transports it
//! connects back over.

pub mod launch;
pub mod transport;
