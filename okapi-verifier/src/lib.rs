//! Supervision and IPC for Okapi's external transaction verifier.
//!
//! The node keeps transaction verification out of its own process: a
//! sandboxed verifier runs as a child process and speaks a framed,
//! version-tagged protocol over a local socket. This crate owns that
//! boundary end to end:
//!
//!  * [`Supervisor`] is the node-side handle. It launches and replaces
//!    verifier processes, serializes verification exchanges, and absorbs
//!    transient faults up to a fixed attempt budget.
//!  * [`protocol::external`] is the wire format both ends speak; it is
//!    public so verifier implementations can build against the same codec
//!    and messages.
//!  * [`protocol::internal`] defines [`Request`] and [`Response`], the
//!    questions a running verifier asks back into the node. The node
//!    answers them with its data-support facade, any [`tower::Service`]
//!    from `Request` to `Response`; lookups that miss yield empty answers,
//!    never errors.
//!
//! Verification outcomes stay strictly separated from infrastructure
//! faults: a transaction the verifier rejects is surfaced as-is and never
//! retried, while process crashes, socket errors and protocol violations
//! are contained, logged, and retried behind the caller's back.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

/// Type alias to make working with tower traits easier.
///
/// Note: the 'static lifetime bound means that the *type* cannot have any
/// non-'static lifetimes, (e.g., when a type containing a borrow is passed to
/// a layer), *not* that the object itself has 'static lifetime.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub mod constants;
pub mod protocol;

mod config;
mod error;
mod sandbox;
mod supervisor;

pub use crate::{
    config::{Config, TransportKind},
    error::{SessionError, VerificationError, VerifyError},
    protocol::internal::{Request, Response},
    sandbox::{
        launch::{ExecutableLauncher, Launcher, SandboxProcess},
        transport::ListenAddr,
    },
    supervisor::Supervisor,
};
