//! Definitions of verifier protocol messages.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use okapi_chain::{
    attachment::{self, AttachmentWithTrust},
    identity::{Party, PartyKey},
    parameters::{self, NetworkParameters},
    transaction::{SerializedState, SerializedTransaction, StateRef},
};

use crate::error::VerificationError;

/// A verifier protocol message.
///
/// The protocol is strictly request/response over a single connection: the
/// node sends `Initialisation` exactly once, then one `VerificationRequest`
/// at a time. While a verification is in flight, the verifier may ask any
/// number of `Get*` sub-requests, each answered by its paired response kind,
/// before finishing the exchange with `VerificationResult`.
///
/// Every dispatch site matches this enum exhaustively, so adding a message
/// kind fails compilation until each site handles it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    /// An `initialise` message, sent by the node once per session, before
    /// anything else.
    ///
    /// Carries the serialization environment and current network parameters
    /// a fresh verifier process needs before it can verify anything.
    Initialisation {
        /// Fully-qualified names of custom serializers the verifier must
        /// register.
        custom_serializers: BTreeSet<String>,
        /// Fully-qualified names making up the serialization whitelist.
        serialization_whitelist: BTreeSet<String>,
        /// An alternative serialization scheme to install, if any.
        custom_scheme: Option<String>,
        /// The network parameters currently in force at the node.
        network_parameters: NetworkParameters,
    },

    /// A `verify` message: one transaction to verify, with every state it
    /// consumes already materialized.
    ///
    /// States are attached eagerly so the verifier does not round-trip for
    /// each input.
    VerificationRequest {
        /// The transaction to verify.
        transaction: SerializedTransaction,
        /// The serialized states the transaction consumes, keyed by
        /// reference.
        states: BTreeMap<StateRef, SerializedState>,
    },

    /// A `getparties` sub-request: resolve the given owning keys to parties.
    GetParties(Vec<PartyKey>),

    /// A `parties` response: one entry per requested key, in request order,
    /// absent where the node knows no such party.
    Parties(Vec<Option<Party>>),

    /// A `getattach` sub-request: fetch one attachment by content id.
    GetAttachment(attachment::Id),

    /// An `attach` response: the materialized attachment paired with the
    /// node's trust decision, or absent if the node has no such attachment.
    Attachment(Option<AttachmentWithTrust>),

    /// A `getattachs` sub-request: fetch several attachments by content id.
    GetAttachments(Vec<attachment::Id>),

    /// An `attachs` response: one entry per requested id, in request order.
    Attachments(Vec<Option<AttachmentWithTrust>>),

    /// A `getnetparams` sub-request: fetch the network parameters snapshot
    /// with the given hash.
    GetNetworkParameters(parameters::Hash),

    /// A `netparams` response: the requested snapshot, or absent if the
    /// node has never seen it.
    NetworkParameters(Option<NetworkParameters>),

    /// A `gettrusted` sub-request: list the node's trusted attachments that
    /// contain the given class name.
    GetTrustedClassAttachments(String),

    /// A `trusted` response: the ids of the matching trusted attachments,
    /// empty when there are none.
    TrustedClassAttachments(Vec<attachment::Id>),

    /// An `outcome` message finishing a verification exchange: success, or
    /// the verifier's rejection, reported verbatim.
    VerificationResult(Result<(), VerificationError>),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Message::Initialisation { .. } => "initialise",
            Message::VerificationRequest { .. } => "verify",
            Message::GetParties(_) => "getparties",
            Message::Parties(_) => "parties",
            Message::GetAttachment(_) => "getattach",
            Message::Attachment(_) => "attach",
            Message::GetAttachments(_) => "getattachs",
            Message::Attachments(_) => "attachs",
            Message::GetNetworkParameters(_) => "getnetparams",
            Message::NetworkParameters(_) => "netparams",
            Message::GetTrustedClassAttachments(_) => "gettrusted",
            Message::TrustedClassAttachments(_) => "trusted",
            Message::VerificationResult(_) => "outcome",
        })
    }
}
