//! Content-addressed attachments.
//!
//! Attachments are immutable blobs of contract code and data, keyed by the
//! hash of their content. The node stores them; the external verifier only
//! ever sees them fully materialized, paired with the node's trust decision.

use std::{fmt, io};

use serde::{Deserialize, Serialize};

use crate::serialization::{
    okapi_serialize_bytes, sha256d, OkapiDeserialize, OkapiSerialize, ReadOkapiExt,
    SerializationError, TrustedPreallocate, WriteOkapiExt, MAX_PROTOCOL_MESSAGE_LEN,
};

/// The content id of an attachment: the SHA256d digest of its bytes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Id(pub [u8; 32]);

impl Id {
    /// Compute the content id of the given attachment bytes.
    pub fn compute(bytes: &[u8]) -> Self {
        use io::Write;

        let mut writer = sha256d::Writer::default();
        writer
            .write_all(bytes)
            .expect("writing to a hasher never fails");
        Self(writer.finish())
    }
}

impl From<[u8; 32]> for Id {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("attachment::Id")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl std::str::FromStr for Id {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        if hex::decode_to_slice(s, &mut bytes[..]).is_err() {
            Err(SerializationError::Parse("hex decoding error"))
        } else {
            Ok(Id(bytes))
        }
    }
}

impl OkapiSerialize for Id {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_32_bytes(&self.0)
    }
}

impl OkapiDeserialize for Id {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(Id(reader.read_32_bytes()?))
    }
}

impl TrustedPreallocate for Id {
    fn max_allocation() -> u64 {
        // An id takes exactly 32 bytes on the wire.
        (MAX_PROTOCOL_MESSAGE_LEN as u64) / 32
    }
}

/// A materialized attachment: its content id and the full content bytes.
#[derive(Clone, Eq, PartialEq)]
pub struct Attachment {
    /// The content id. Always the hash of `data`.
    pub id: Id,
    /// The full attachment content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Build an attachment from its content, computing the id.
    pub fn new(data: Vec<u8>) -> Self {
        let id = Id::compute(&data);
        Attachment { id, data }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("data", &format_args!("{} bytes", self.data.len()))
            .finish()
    }
}

impl OkapiSerialize for Attachment {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.id.okapi_serialize(&mut writer)?;
        okapi_serialize_bytes(&self.data, &mut writer)
    }
}

impl OkapiDeserialize for Attachment {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let id = Id::okapi_deserialize(&mut reader)?;
        let data = Vec::okapi_deserialize(&mut reader)?;
        if id != Id::compute(&data) {
            return Err(SerializationError::Parse(
                "attachment id does not match attachment content",
            ));
        }
        Ok(Attachment { id, data })
    }
}

/// An attachment paired with the node's trust decision for it.
///
/// Trust is a node-side judgement, so it travels alongside the content
/// rather than inside it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentWithTrust {
    /// The materialized attachment.
    pub attachment: Attachment,
    /// Whether the node trusts this attachment's code.
    pub trusted: bool,
}

impl OkapiSerialize for AttachmentWithTrust {
    fn okapi_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.attachment.okapi_serialize(&mut writer)?;
        self.trusted.okapi_serialize(&mut writer)
    }
}

impl OkapiDeserialize for AttachmentWithTrust {
    fn okapi_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(AttachmentWithTrust {
            attachment: Attachment::okapi_deserialize(&mut reader)?,
            trusted: bool::okapi_deserialize(&mut reader)?,
        })
    }
}

impl TrustedPreallocate for AttachmentWithTrust {
    fn max_allocation() -> u64 {
        // An id, a content length prefix, and the trust flag.
        (MAX_PROTOCOL_MESSAGE_LEN as u64) / 34
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::serialization::OkapiDeserializeInto;

    #[test]
    fn attachment_id_matches_content() {
        let attachment = Attachment::new(b"contract bytes".to_vec());
        assert_eq!(attachment.id, Id::compute(b"contract bytes"));
    }

    #[test]
    fn corrupted_attachment_content_is_rejected() {
        let attachment = Attachment::new(b"contract bytes".to_vec());
        let mut bytes = attachment
            .okapi_serialize_to_vec()
            .expect("vec write never fails");

        // flip one content byte, leaving the id untouched
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let result: Result<Attachment, _> = Cursor::new(bytes).okapi_deserialize_into();
        assert!(matches!(result, Err(SerializationError::Parse(_))));
    }

    #[test]
    fn attachment_with_trust_roundtrip() {
        let with_trust = AttachmentWithTrust {
            attachment: Attachment::new(vec![0xde, 0xad, 0xbe, 0xef]),
            trusted: true,
        };

        let bytes = with_trust
            .okapi_serialize_to_vec()
            .expect("vec write never fails");
        let back: AttachmentWithTrust = Cursor::new(bytes)
            .okapi_deserialize_into()
            .expect("roundtrip");
        assert_eq!(with_trust, back);
    }
}
