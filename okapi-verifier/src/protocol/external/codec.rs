//! A Tokio codec mapping byte streams to verifier message streams.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    io::{Cursor, Read, Write},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use okapi_chain::{
    attachment, parameters,
    serialization::{
        sha256d, FakeWriter, OkapiDeserialize, OkapiSerialize, ReadOkapiExt,
        SerializationError as Error, MAX_PROTOCOL_MESSAGE_LEN,
    },
    transaction::SerializedTransaction,
};

use crate::{constants, error::VerificationError};

use super::{
    message::Message,
    types::{Magic, Version},
};

/// The length of a verifier frame header.
const HEADER_LEN: usize = 28usize;

/// A codec which produces verifier messages from byte streams and vice versa.
pub struct Codec {
    builder: Builder,
    state: DecodeState,
}

/// A builder for specifying [`Codec`] options.
pub struct Builder {
    /// The wire version to tag outgoing frames with.
    ///
    /// Incoming frames tagged with a version newer than this one, or older
    /// than [`constants::MIN_WIRE_VERSION`], are rejected as fatal.
    version: Version,
    /// The maximum allowable message length.
    max_len: usize,
    /// An optional session label, to use for reporting metrics.
    metrics_label: Option<String>,
}

impl Codec {
    /// Return a builder for constructing a [`Codec`].
    pub fn builder() -> Builder {
        Builder {
            version: constants::CURRENT_WIRE_VERSION,
            max_len: MAX_PROTOCOL_MESSAGE_LEN,
            metrics_label: None,
        }
    }
}

impl Builder {
    /// Finalize the builder and return a [`Codec`].
    pub fn finish(self) -> Codec {
        Codec {
            builder: self,
            state: DecodeState::Head,
        }
    }

    /// Configure the codec for the given wire [`Version`].
    #[allow(dead_code)]
    pub fn for_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Configure the codec's maximum accepted payload size, in bytes.
    #[allow(dead_code)]
    pub fn with_max_body_len(mut self, len: usize) -> Self {
        self.max_len = len;
        self
    }

    /// Configure the codec with a label identifying the session, to use for
    /// reporting metrics.
    pub fn with_metrics_label(mut self, metrics_label: String) -> Self {
        self.metrics_label = Some(metrics_label);
        self
    }
}

// ======== Encoding =========

impl Encoder<Message> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        use Error::Parse;

        let body_length = self.body_length(&item);

        if body_length > self.builder.max_len {
            return Err(Parse("body length exceeded maximum size"));
        }

        if let Some(label) = self.builder.metrics_label.clone() {
            metrics::counter!("okapi.verifier.out.bytes.total",
                              (body_length + HEADER_LEN) as u64,
                              "session" => label);
        }

        use Message::*;
        // All arms must be &[u8; 12], so one full-width command checks the
        // zero padding of every other arm at compile time.
        let command = match item {
            Initialisation { .. } => b"initialise\0\0",
            VerificationRequest { .. } => b"verify\0\0\0\0\0\0",
            GetParties { .. } => b"getparties\0\0",
            Parties { .. } => b"parties\0\0\0\0\0",
            GetAttachment { .. } => b"getattach\0\0\0",
            Attachment { .. } => b"attach\0\0\0\0\0\0",
            GetAttachments { .. } => b"getattachs\0\0",
            Attachments { .. } => b"attachs\0\0\0\0\0",
            GetNetworkParameters { .. } => b"getnetparams",
            NetworkParameters { .. } => b"netparams\0\0\0",
            GetTrustedClassAttachments { .. } => b"gettrusted\0\0",
            TrustedClassAttachments { .. } => b"trusted\0\0\0\0\0",
            VerificationResult { .. } => b"outcome\0\0\0\0\0",
        };
        trace!(?item, len = body_length);

        dst.reserve(HEADER_LEN + body_length);
        let start_len = dst.len();
        {
            let dst = &mut dst.writer();
            dst.write_all(&constants::PROTOCOL_MAGIC.0[..])?;
            dst.write_u32::<LittleEndian>(self.builder.version.0)?;
            dst.write_all(command)?;
            dst.write_u32::<LittleEndian>(body_length as u32)?;

            // We zero the checksum at first, and compute it later
            // after the body has been written.
            dst.write_u32::<LittleEndian>(0)?;

            self.write_body(&item, dst)?;
        }
        let checksum = sha256d::Checksum::from(&dst[start_len + HEADER_LEN..]);
        dst[start_len + 24..][..4].copy_from_slice(&checksum.0);

        Ok(())
    }
}

impl Codec {
    /// Obtain the size of the body of a given message. This will match the
    /// number of bytes written to the writer provided to `write_body` for the
    /// same message.
    fn body_length(&self, msg: &Message) -> usize {
        let mut writer = FakeWriter(0);

        self.write_body(msg, &mut writer)
            .expect("writer should never fail");
        writer.0
    }

    /// Write the body of the message into the given writer. This allows writing
    /// the message body prior to writing the header, so that the header can
    /// contain a checksum of the message body.
    fn write_body<W: Write>(&self, msg: &Message, mut writer: W) -> Result<(), Error> {
        match msg {
            Message::Initialisation {
                custom_serializers,
                serialization_whitelist,
                custom_scheme,
                network_parameters,
            } => {
                custom_serializers.okapi_serialize(&mut writer)?;
                serialization_whitelist.okapi_serialize(&mut writer)?;
                custom_scheme.okapi_serialize(&mut writer)?;
                network_parameters.okapi_serialize(&mut writer)?;
            }
            Message::VerificationRequest {
                transaction,
                states,
            } => {
                transaction.okapi_serialize(&mut writer)?;
                states.okapi_serialize(&mut writer)?;
            }
            Message::GetParties(keys) => keys.okapi_serialize(&mut writer)?,
            Message::Parties(parties) => parties.okapi_serialize(&mut writer)?,
            Message::GetAttachment(id) => id.okapi_serialize(&mut writer)?,
            Message::Attachment(attachment) => attachment.okapi_serialize(&mut writer)?,
            Message::GetAttachments(ids) => ids.okapi_serialize(&mut writer)?,
            Message::Attachments(attachments) => attachments.okapi_serialize(&mut writer)?,
            Message::GetNetworkParameters(hash) => hash.okapi_serialize(&mut writer)?,
            Message::NetworkParameters(parameters) => parameters.okapi_serialize(&mut writer)?,
            Message::GetTrustedClassAttachments(class_name) => {
                class_name.okapi_serialize(&mut writer)?
            }
            Message::TrustedClassAttachments(ids) => ids.okapi_serialize(&mut writer)?,
            Message::VerificationResult(outcome) => match outcome {
                Ok(()) => true.okapi_serialize(&mut writer)?,
                Err(rejection) => {
                    false.okapi_serialize(&mut writer)?;
                    rejection.reason.okapi_serialize(&mut writer)?;
                }
            },
        }
        Ok(())
    }
}

// ======== Decoding =========

enum DecodeState {
    Head,
    Body {
        body_len: usize,
        command: [u8; 12],
        checksum: sha256d::Checksum,
    },
}

impl fmt::Debug for DecodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeState::Head => write!(f, "DecodeState::Head"),
            DecodeState::Body {
                body_len,
                command,
                checksum,
            } => f
                .debug_struct("DecodeState::Body")
                .field("body_len", &body_len)
                .field("command", &String::from_utf8_lossy(command))
                .field("checksum", &checksum)
                .finish(),
        }
    }
}

impl Decoder for Codec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        use Error::Parse;
        match self.state {
            DecodeState::Head => {
                // First check that the src buffer contains an entire header.
                if src.len() < HEADER_LEN {
                    trace!(?self.state, "src buffer does not have an entire header, waiting");
                    // Signal that decoding requires more data.
                    return Ok(None);
                }

                // Now that we know that src contains a header, split off the header section.
                let header = src.split_to(HEADER_LEN);

                // Create a cursor over the header and parse its fields.
                let mut header_reader = Cursor::new(&header);
                let magic = Magic(header_reader.read_4_bytes()?);
                let version = Version(header_reader.read_u32::<LittleEndian>()?);
                let command = header_reader.read_12_bytes()?;
                let body_len = header_reader.read_u32::<LittleEndian>()? as usize;
                let checksum = sha256d::Checksum(header_reader.read_4_bytes()?);
                trace!(
                    ?self.state,
                    ?magic,
                    ?version,
                    command = %String::from_utf8_lossy(&command),
                    body_len,
                    ?checksum,
                    "read header from src buffer"
                );

                if magic != constants::PROTOCOL_MAGIC {
                    return Err(Parse("supplied magic did not match the protocol magic"));
                }
                if version < constants::MIN_WIRE_VERSION || version > self.builder.version {
                    return Err(Parse("unsupported wire version"));
                }
                if body_len > self.builder.max_len {
                    return Err(Parse("body length exceeded maximum size"));
                }

                if let Some(label) = self.builder.metrics_label.clone() {
                    metrics::counter!("okapi.verifier.in.bytes.total",
                                      (body_len + HEADER_LEN) as u64,
                                      "session" => label);
                }

                // Reserve buffer space for the expected body and the following header.
                src.reserve(body_len + HEADER_LEN);

                self.state = DecodeState::Body {
                    body_len,
                    command,
                    checksum,
                };

                // Now that the state is updated, recurse to attempt body decoding.
                self.decode(src)
            }
            DecodeState::Body {
                body_len,
                command,
                checksum,
            } => {
                if src.len() < body_len {
                    // Need to wait for the full body
                    trace!(?self.state, len = src.len(), "src buffer does not have an entire body, waiting");
                    return Ok(None);
                }

                // Now that we know we have the full body, split off the body,
                // and reset the decoder state for the next message. Otherwise
                // we will attempt to read the next header as the current body.
                let body = src.split_to(body_len);
                self.state = DecodeState::Head;

                if checksum != sha256d::Checksum::from(&body[..]) {
                    return Err(Parse(
                        "supplied message checksum does not match computed checksum",
                    ));
                }

                let mut body_reader = Cursor::new(&body);
                match &command {
                    b"initialise\0\0" => self.read_initialisation(&mut body_reader),
                    b"verify\0\0\0\0\0\0" => self.read_verification_request(&mut body_reader),
                    b"getparties\0\0" => self.read_get_parties(&mut body_reader),
                    b"parties\0\0\0\0\0" => self.read_parties(&mut body_reader),
                    b"getattach\0\0\0" => self.read_get_attachment(&mut body_reader),
                    b"attach\0\0\0\0\0\0" => self.read_attachment(&mut body_reader),
                    b"getattachs\0\0" => self.read_get_attachments(&mut body_reader),
                    b"attachs\0\0\0\0\0" => self.read_attachments(&mut body_reader),
                    b"getnetparams" => self.read_get_network_parameters(&mut body_reader),
                    b"netparams\0\0\0" => self.read_network_parameters(&mut body_reader),
                    b"gettrusted\0\0" => self.read_get_trusted_class_attachments(&mut body_reader),
                    b"trusted\0\0\0\0\0" => self.read_trusted_class_attachments(&mut body_reader),
                    b"outcome\0\0\0\0\0" => self.read_verification_result(&mut body_reader),
                    _ => {
                        let command_string = String::from_utf8_lossy(&command);

                        // The verifier is the only peer on this connection,
                        // and both ends must run matching protocol builds, so
                        // an unrecognized command means the stream is corrupt
                        // or the builds are mismatched. Either way this
                        // session cannot continue.
                        debug!(?command, %command_string, "unknown message command");
                        return Err(Parse("unknown message command"));
                    }
                }
                // We need Ok(Some(msg)) to signal that we're done decoding.
                // This is also convenient for tracing the parse result.
                .map(|msg| {
                    // A newer verifier build may append fields to a message
                    // body, so trailing bytes are tolerated and the known
                    // prefix is kept.
                    let extra_bytes = body.len() as u64 - body_reader.position();
                    if extra_bytes == 0 {
                        trace!(?extra_bytes, %msg, "finished message decoding");
                    } else {
                        // log when there are extra bytes, so we know when the
                        // message formats need upgrading
                        debug!(?extra_bytes, %msg, "extra data after decoding message");
                    }
                    Some(msg)
                })
            }
        }
    }
}

impl Codec {
    fn read_initialisation<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::Initialisation {
            custom_serializers: BTreeSet::okapi_deserialize(&mut reader)?,
            serialization_whitelist: BTreeSet::okapi_deserialize(&mut reader)?,
            custom_scheme: Option::okapi_deserialize(&mut reader)?,
            network_parameters: parameters::NetworkParameters::okapi_deserialize(&mut reader)?,
        })
    }

    fn read_verification_request<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::VerificationRequest {
            transaction: SerializedTransaction::okapi_deserialize(&mut reader)?,
            states: BTreeMap::okapi_deserialize(&mut reader)?,
        })
    }

    fn read_get_parties<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::GetParties(Vec::okapi_deserialize(&mut reader)?))
    }

    fn read_parties<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::Parties(Vec::okapi_deserialize(&mut reader)?))
    }

    fn read_get_attachment<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::GetAttachment(attachment::Id::okapi_deserialize(
            &mut reader,
        )?))
    }

    fn read_attachment<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::Attachment(Option::okapi_deserialize(&mut reader)?))
    }

    fn read_get_attachments<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::GetAttachments(Vec::okapi_deserialize(&mut reader)?))
    }

    fn read_attachments<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::Attachments(Vec::okapi_deserialize(&mut reader)?))
    }

    fn read_get_network_parameters<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::GetNetworkParameters(
            parameters::Hash::okapi_deserialize(&mut reader)?,
        ))
    }

    fn read_network_parameters<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::NetworkParameters(Option::okapi_deserialize(
            &mut reader,
        )?))
    }

    fn read_get_trusted_class_attachments<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::GetTrustedClassAttachments(
            String::okapi_deserialize(&mut reader)?,
        ))
    }

    fn read_trusted_class_attachments<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        Ok(Message::TrustedClassAttachments(Vec::okapi_deserialize(
            &mut reader,
        )?))
    }

    fn read_verification_result<R: Read>(&self, mut reader: R) -> Result<Message, Error> {
        let verified = bool::okapi_deserialize(&mut reader)?;
        let outcome = if verified {
            Ok(())
        } else {
            Err(VerificationError {
                reason: String::okapi_deserialize(&mut reader)?,
            })
        };
        Ok(Message::VerificationResult(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::prelude::*;
    use lazy_static::lazy_static;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use okapi_chain::{
        attachment::{Attachment, AttachmentWithTrust},
        identity::{Party, PartyKey},
        parameters::NetworkParameters,
        transaction::{SerializedState, SerializedTransaction, StateRef},
    };

    lazy_static! {
        static ref INITIALISATION_TEST_VECTOR: Message = Message::Initialisation {
            custom_serializers: ["com.okapi.serialization.AmountSerializer".to_string()]
                .into_iter()
                .collect(),
            serialization_whitelist: [
                "com.okapi.contracts.Cash".to_string(),
                "com.okapi.contracts.Obligation".to_string(),
            ]
            .into_iter()
            .collect(),
            custom_scheme: Some("com.okapi.serialization.BinaryScheme".to_string()),
            network_parameters: NetworkParameters {
                epoch: 7,
                ..NetworkParameters::default()
            },
        };
        static ref VERIFICATION_REQUEST_TEST_VECTOR: Message = {
            let transaction = SerializedTransaction(vec![0x4f; 302]);
            let consumed = SerializedTransaction(vec![0x2a; 64]);
            let states = [
                (
                    StateRef {
                        hash: consumed.hash(),
                        index: 0,
                    },
                    SerializedState(vec![0x11; 48]),
                ),
                (
                    StateRef {
                        hash: consumed.hash(),
                        index: 3,
                    },
                    SerializedState(vec![0x22; 16]),
                ),
            ]
            .into_iter()
            .collect();

            Message::VerificationRequest {
                transaction,
                states,
            }
        };
    }

    /// Encode `msg` into bytes and decode it back through the framed codec.
    fn round_trip(msg: &Message) -> Message {
        let (rt, _init_guard) = okapi_test::init_async();

        let bytes = rt.block_on(async {
            let mut bytes = Vec::new();
            {
                let mut fw = FramedWrite::new(&mut bytes, Codec::builder().finish());
                fw.send(msg.clone())
                    .await
                    .expect("message should be serialized");
            }
            bytes
        });

        rt.block_on(async {
            let mut fr = FramedRead::new(Cursor::new(&bytes), Codec::builder().finish());
            fr.next()
                .await
                .expect("a next message should be available")
                .expect("that message should deserialize")
        })
    }

    /// Encode `msg` with the default codec and return the raw frame bytes.
    fn encode_frame(msg: &Message) -> BytesMut {
        let mut codec = Codec::builder().finish();
        let mut bytes = BytesMut::new();
        codec
            .encode(msg.clone(), &mut bytes)
            .expect("message should encode");
        bytes
    }

    #[test]
    fn initialisation_message_round_trip() {
        let v = &*INITIALISATION_TEST_VECTOR;
        assert_eq!(*v, round_trip(v));
    }

    #[test]
    fn verification_request_round_trip() {
        let v = &*VERIFICATION_REQUEST_TEST_VECTOR;
        assert_eq!(*v, round_trip(v));
    }

    #[test]
    fn party_messages_round_trip() {
        let known = PartyKey(vec![0x02; 33]);
        let unknown = PartyKey(vec![0x03; 33]);

        let request = Message::GetParties(vec![known.clone(), unknown]);
        assert_eq!(request, round_trip(&request));

        let response = Message::Parties(vec![
            Some(Party {
                name: "O=Okapi Services, L=Nairobi, C=KE".to_string(),
                owning_key: known,
            }),
            None,
        ]);
        assert_eq!(response, round_trip(&response));
    }

    #[test]
    fn attachment_messages_round_trip() {
        let attachment = Attachment::new(b"contract bytes".to_vec());
        let missing = attachment::Id([0x99; 32]);

        let request = Message::GetAttachment(attachment.id);
        assert_eq!(request, round_trip(&request));

        let response = Message::Attachment(Some(AttachmentWithTrust {
            attachment: attachment.clone(),
            trusted: true,
        }));
        assert_eq!(response, round_trip(&response));

        let request = Message::GetAttachments(vec![attachment.id, missing]);
        assert_eq!(request, round_trip(&request));

        let response = Message::Attachments(vec![
            Some(AttachmentWithTrust {
                attachment,
                trusted: false,
            }),
            None,
        ]);
        assert_eq!(response, round_trip(&response));
    }

    #[test]
    fn network_parameters_messages_round_trip() {
        let parameters = NetworkParameters::default();

        let request = Message::GetNetworkParameters(parameters.hash());
        assert_eq!(request, round_trip(&request));

        let response = Message::NetworkParameters(Some(parameters));
        assert_eq!(response, round_trip(&response));

        let response = Message::NetworkParameters(None);
        assert_eq!(response, round_trip(&response));
    }

    #[test]
    fn trusted_class_attachment_messages_round_trip() {
        let request =
            Message::GetTrustedClassAttachments("com.okapi.contracts.Cash".to_string());
        assert_eq!(request, round_trip(&request));

        let response =
            Message::TrustedClassAttachments(vec![attachment::Id([0x41; 32])]);
        assert_eq!(response, round_trip(&response));

        let response = Message::TrustedClassAttachments(Vec::new());
        assert_eq!(response, round_trip(&response));
    }

    #[test]
    fn verification_result_round_trip() {
        let success = Message::VerificationResult(Ok(()));
        assert_eq!(success, round_trip(&success));

        let rejection = Message::VerificationResult(Err(VerificationError {
            reason: "contract constraint violated: insufficient signers".to_string(),
        }));
        assert_eq!(rejection, round_trip(&rejection));
    }

    /// Check that a frame split at every possible point decodes once the
    /// remainder arrives, and never produces a message or an error early.
    #[test]
    fn split_frames_decode_whole() {
        let _init_guard = okapi_test::init();

        let frame = encode_frame(&VERIFICATION_REQUEST_TEST_VECTOR);

        for split in 0..frame.len() {
            let mut codec = Codec::builder().finish();
            let mut buffer = BytesMut::from(&frame[..split]);

            assert_eq!(
                codec
                    .decode(&mut buffer)
                    .expect("partial frame should not error"),
                None,
                "partial frame of {split} bytes should be incomplete",
            );

            buffer.extend_from_slice(&frame[split..]);
            let msg = codec
                .decode(&mut buffer)
                .expect("whole frame should decode")
                .expect("whole frame should produce a message");
            assert_eq!(msg, *VERIFICATION_REQUEST_TEST_VECTOR);
        }
    }

    #[test]
    fn consecutive_frames_decode_in_order() {
        let _init_guard = okapi_test::init();

        let first = Message::GetParties(vec![PartyKey(vec![0x02; 33])]);
        let second = Message::VerificationResult(Ok(()));

        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(&encode_frame(&first));
        buffer.extend_from_slice(&encode_frame(&second));

        let mut codec = Codec::builder().finish();
        assert_eq!(codec.decode(&mut buffer).expect("decode"), Some(first));
        assert_eq!(codec.decode(&mut buffer).expect("decode"), Some(second));
        assert_eq!(codec.decode(&mut buffer).expect("decode"), None);
    }

    /// Check that trailing body bytes are tolerated, so hosts can read the
    /// prefix of messages from a newer verifier build.
    #[test]
    fn trailing_body_bytes_are_tolerated() {
        let _init_guard = okapi_test::init();

        let msg = Message::GetParties(vec![PartyKey(vec![0x02; 33])]);
        let mut codec = Codec::builder().finish();

        let mut body = Vec::new();
        codec
            .write_body(&msg, &mut body)
            .expect("vec write never fails");
        body.extend_from_slice(&[0xaa, 0xbb]);

        let mut frame = BytesMut::new();
        frame.extend_from_slice(&constants::PROTOCOL_MAGIC.0);
        frame.extend_from_slice(&constants::CURRENT_WIRE_VERSION.0.to_le_bytes());
        frame.extend_from_slice(b"getparties\0\0");
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&sha256d::Checksum::from(&body[..]).0);
        frame.extend_from_slice(&body);

        let parsed = codec
            .decode(&mut frame)
            .expect("frame with trailing bytes should decode")
            .expect("a message should be produced");
        assert_eq!(parsed, msg);
    }

    #[test]
    fn frame_with_wrong_magic_is_fatal() {
        let _init_guard = okapi_test::init();

        let mut frame = encode_frame(&Message::GetParties(Vec::new()));
        frame[0] ^= 0xff;

        let mut codec = Codec::builder().finish();
        let err = codec
            .decode(&mut frame)
            .expect_err("wrong magic should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn frame_with_unsupported_version_is_fatal() {
        let _init_guard = okapi_test::init();

        // Newer than the version this codec speaks.
        let mut frame = encode_frame(&Message::GetParties(Vec::new()));
        frame[4..8].copy_from_slice(&u32::MAX.to_le_bytes());

        let mut codec = Codec::builder().finish();
        let err = codec
            .decode(&mut frame)
            .expect_err("newer version should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));

        // Older than the minimum supported version.
        let mut frame = encode_frame(&Message::GetParties(Vec::new()));
        frame[4..8].copy_from_slice(&0u32.to_le_bytes());

        let mut codec = Codec::builder().finish();
        let err = codec
            .decode(&mut frame)
            .expect_err("older version should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn frame_with_corrupt_checksum_is_fatal() {
        let _init_guard = okapi_test::init();

        let mut frame =
            encode_frame(&Message::GetTrustedClassAttachments("com.okapi".to_string()));
        let last = frame.len() - 1;
        frame[last] ^= 0xff;

        let mut codec = Codec::builder().finish();
        let err = codec
            .decode(&mut frame)
            .expect_err("corrupt body should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn frame_with_unknown_command_is_fatal() {
        let _init_guard = okapi_test::init();

        // The checksum only covers the body, so the frame stays
        // well-formed after the command is overwritten.
        let mut frame = encode_frame(&Message::GetParties(Vec::new()));
        frame[8..20].copy_from_slice(b"nonsense\0\0\0\0");

        let mut codec = Codec::builder().finish();
        let err = codec
            .decode(&mut frame)
            .expect_err("unknown command should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));
    }

    /// An oversized body is rejected at encode time and at decode time.
    #[test]
    fn oversized_body_is_rejected() {
        let _init_guard = okapi_test::init();

        let oversized = Message::GetTrustedClassAttachments("x".repeat(2 * 1024));

        let mut codec = Codec::builder().with_max_body_len(1024).finish();
        let mut bytes = BytesMut::new();
        let err = codec
            .encode(oversized.clone(), &mut bytes)
            .expect_err("oversized body should not encode");
        assert!(matches!(err, Error::Parse(_)));

        let frame = encode_frame(&oversized);
        let mut strict = Codec::builder().with_max_body_len(1024).finish();
        let mut buffer = BytesMut::from(&frame[..]);
        let err = strict
            .decode(&mut buffer)
            .expect_err("oversized frame should be a fatal parse error");
        assert!(matches!(err, Error::Parse(_)));
    }
}
