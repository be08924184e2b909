use okapi_chain::{
    attachment::{self, AttachmentWithTrust},
    identity::Party,
    parameters::NetworkParameters,
};

/// A response to a data request, represented in internal format.
#[derive(Clone, Debug)]
pub enum Response {
    /// The parties for a `Parties` request, one entry per requested key,
    /// absent where the node knows no such party.
    Parties(Vec<Option<Party>>),

    /// The attachment for an `Attachment` request, absent if the node has
    /// no attachment with that id.
    Attachment(Option<AttachmentWithTrust>),

    /// The attachments for an `Attachments` request, one entry per
    /// requested id.
    Attachments(Vec<Option<AttachmentWithTrust>>),

    /// The snapshot for a `NetworkParameters` request, absent if the node
    /// has never seen parameters with that hash.
    NetworkParameters(Option<NetworkParameters>),

    /// The matching attachment ids for a `TrustedClassAttachments`
    /// request, empty when there are none.
    TrustedClassAttachments(Vec<attachment::Id>),

    /// The parameters currently in force, for a `CurrentNetworkParameters`
    /// request.
    CurrentNetworkParameters(NetworkParameters),
}
