//! Core ledger datastructures for Okapi.
//!
//! This crate contains the types shared between the node and its external
//! verifier: content-addressed attachments, ledger identities, network
//! parameters, opaque transaction payloads, and the canonical serialization
//! they travel in.

#![deny(missing_docs)]

pub mod attachment;
pub mod identity;
pub mod parameters;
pub mod serialization;
pub mod transaction;
