use okapi_chain::{attachment, identity::PartyKey, parameters};

/// A data request to the node, represented in internal format.
///
/// Most requests are translated one-to-one from a verifier wire
/// sub-request. [`Request::CurrentNetworkParameters`] is the exception: the
/// supervisor issues it itself while starting a session, to fill the
/// initialisation message for the fresh verifier process.
///
/// Lookups that miss are not errors. The facade answers them with an absent
/// entry, and the verifier decides what that means for the transaction.
#[derive(Clone, Debug)]
pub enum Request {
    /// Resolve the given owning keys to parties, in request order.
    Parties(Vec<PartyKey>),

    /// Fetch one attachment by content id, fully materialized, together
    /// with the node's trust decision for it.
    Attachment(attachment::Id),

    /// Fetch several attachments by content id, in request order.
    ///
    /// This takes a `Vec` rather than a set because the verifier's request
    /// order fixes the response order, and duplicates must be answered
    /// positionally rather than collapsed.
    Attachments(Vec<attachment::Id>),

    /// Fetch the network parameters snapshot with the given hash.
    NetworkParameters(parameters::Hash),

    /// List the node's trusted attachments that contain the given class
    /// name.
    TrustedClassAttachments(String),

    /// Read the network parameters currently in force at the node.
    CurrentNetworkParameters,
}
