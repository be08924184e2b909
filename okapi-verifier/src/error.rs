//! Errors that can occur while verifying transactions out of process.
//!
//! There are two distinct failure planes. A [`VerificationError`] is the
//! verifier's judgement of the submitted transaction, so it is final and
//! never retried. A [`SessionError`] is an infrastructure fault on one
//! session, after which the transaction has still not been judged, so the
//! supervisor retries it on a fresh session.

use std::{io, process::ExitStatus};

use thiserror::Error;

use okapi_chain::serialization::SerializationError;

use crate::{protocol::external::Message, BoxError};

/// A rejection reported by the verifier for a specific transaction.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("transaction failed verification: {reason}")]
pub struct VerificationError {
    /// The verifier's description of what made the transaction invalid,
    /// relayed verbatim.
    pub reason: String,
}

/// An infrastructure fault on a single verifier session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection to the verifier closed before a result arrived.
    #[error("connection to the verifier closed unexpectedly")]
    ConnectionClosed,

    /// An I/O error on the connection to the verifier.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    /// A frame on the connection could not be encoded or decoded.
    #[error("protocol serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The verifier sent a message that is not valid at this point in the
    /// exchange.
    #[error("unexpected {0} message from the verifier")]
    UnexpectedMessage(Box<Message>),

    /// The verifier process could not be spawned.
    #[error("failed to spawn the verifier process: {0}")]
    Spawn(io::Error),

    /// The verifier process exited while the session was being established.
    #[error("verifier process exited during session setup: {0:?}")]
    ProcessExited(Option<ExitStatus>),

    /// The node-side data facade failed to answer a verifier sub-request.
    #[error("error from the data facade")]
    Facade(#[source] BoxError),
}

/// An error from [`Supervisor::verify`](crate::Supervisor::verify).
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The verifier judged the transaction invalid.
    ///
    /// This verdict is final for the submitted transaction: resubmitting it
    /// would produce the same answer, so it is never retried.
    #[error(transparent)]
    Invalid(#[from] VerificationError),

    /// Every attempt at obtaining a verdict failed with an infrastructure
    /// fault.
    #[error("unable to verify the transaction after {attempts} attempts: {source}")]
    Unavailable {
        /// How many sessions were attempted before giving up.
        attempts: u32,
        /// The fault from the final attempt.
        source: SessionError,
    },

    /// The supervisor has already been closed.
    #[error("the verifier supervisor is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_error_mentions_unable_to_verify() {
        let err = VerifyError::Unavailable {
            attempts: 5,
            source: SessionError::ConnectionClosed,
        };

        let msg = err.to_string();
        assert!(msg.contains("unable to verify"), "unexpected message: {msg}");
        assert!(msg.contains('5'), "unexpected message: {msg}");
    }

    #[test]
    fn invalid_error_relays_the_verifier_reason() {
        let err = VerifyError::from(VerificationError {
            reason: "missing notary signature".to_string(),
        });

        assert!(
            err.to_string().contains("missing notary signature"),
            "unexpected message: {err}"
        );
    }
}
