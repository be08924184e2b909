//! A single verifier process and the connection it answers over.

use std::collections::BTreeMap;

use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_util::codec::Framed;
use tower::{Service, ServiceExt};
use tracing_futures::Instrument;

use okapi_chain::transaction::{SerializedState, SerializedTransaction, StateRef};

use crate::{
    config::Config,
    error::{SessionError, VerificationError},
    protocol::{
        external::{Codec, Message},
        internal::{Request, Response},
    },
    sandbox::{
        launch::{Launcher, SandboxProcess},
        transport::{Listener, SandboxStream},
    },
    BoxError,
};

use super::SessionSlot;

/// A live verifier session.
///
/// A session lives exactly as long as one verifier process. It is created
/// by launching the process and performing the initialisation handshake,
/// serves any number of verification exchanges, and ends by killing the
/// process, either explicitly through [`Session::close`] or implicitly
/// when the session is dropped.
pub(super) struct Session {
    id: u64,
    stream: Framed<SandboxStream, Codec>,

    /// Channel to the exit monitor that owns the process.
    ///
    /// Sending a completion channel asks the monitor to kill the process
    /// and acknowledge once it has been reaped. Dropping this half kills
    /// the process too, without the acknowledgement.
    exit_tx: oneshot::Sender<oneshot::Sender<()>>,
}

impl Session {
    /// The identifier this session registers in the shared session slot.
    pub(super) fn id(&self) -> u64 {
        self.id
    }

    /// Launch a verifier process, wait for it to connect back, and send
    /// the one-time initialisation message.
    ///
    /// The listener must already be bound when the process is spawned, so
    /// even the fastest-starting process finds the rendezvous address
    /// live.
    pub(super) async fn connect<S>(
        id: u64,
        listener: &Listener,
        launcher: &dyn Launcher,
        config: &Config,
        facade: &mut S,
        slot: SessionSlot,
    ) -> Result<Session, SessionError>
    where
        S: Service<Request, Response = Response, Error = BoxError> + Send + 'static,
        S::Future: Send,
    {
        let addr = listener.local_addr()?;
        let mut process = launcher.launch(&addr).map_err(SessionError::Spawn)?;

        let stream = tokio::select! {
            conn = listener.accept() => conn?,
            status = process.wait() => {
                return Err(SessionError::ProcessExited(status.ok()));
            }
        };

        let mut stream = Framed::new(
            stream,
            Codec::builder().with_metrics_label(id.to_string()).finish(),
        );

        // The verifier needs the node's current network parameters before
        // it sees its first transaction.
        let network_parameters =
            match facade_call(facade, Request::CurrentNetworkParameters).await? {
                Response::CurrentNetworkParameters(parameters) => parameters,
                response => {
                    return Err(mismatched_response("current network parameters", response))
                }
            };

        stream
            .send(Message::Initialisation {
                custom_serializers: config.custom_serializers.clone(),
                serialization_whitelist: config.serialization_whitelist.clone(),
                custom_scheme: config.custom_serialization_scheme.clone(),
                network_parameters,
            })
            .await?;

        let (exit_tx, exit_rx) = oneshot::channel();
        let pid = process.id();
        tokio::spawn(
            exit_monitor(process, exit_rx, id, slot)
                .instrument(info_span!("exit_monitor", session = id, pid)),
        );

        debug!(session = id, "verifier session established");

        Ok(Session {
            id,
            stream,
            exit_tx,
        })
    }

    /// Submit one transaction and drive the exchange until the verifier
    /// returns its verdict.
    ///
    /// While the verifier deliberates it may ask for parties, attachments,
    /// and network parameters; each of those is answered from the data
    /// facade before reading on. No message may arrive out of turn: the
    /// exchange is strictly one question, one answer.
    pub(super) async fn verify_transaction<S>(
        &mut self,
        facade: &mut S,
        transaction: SerializedTransaction,
        states: BTreeMap<StateRef, SerializedState>,
    ) -> Result<Result<(), VerificationError>, SessionError>
    where
        S: Service<Request, Response = Response, Error = BoxError> + Send + 'static,
        S::Future: Send,
    {
        self.stream
            .send(Message::VerificationRequest {
                transaction,
                states,
            })
            .await?;

        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or(SessionError::ConnectionClosed)??;

            let reply = match message {
                Message::GetParties(keys) => {
                    match facade_call(facade, Request::Parties(keys)).await? {
                        Response::Parties(parties) => Message::Parties(parties),
                        response => return Err(mismatched_response("parties", response)),
                    }
                }
                Message::GetAttachment(id) => {
                    match facade_call(facade, Request::Attachment(id)).await? {
                        Response::Attachment(attachment) => Message::Attachment(attachment),
                        response => return Err(mismatched_response("an attachment", response)),
                    }
                }
                Message::GetAttachments(ids) => {
                    match facade_call(facade, Request::Attachments(ids)).await? {
                        Response::Attachments(attachments) => Message::Attachments(attachments),
                        response => return Err(mismatched_response("attachments", response)),
                    }
                }
                Message::GetNetworkParameters(hash) => {
                    match facade_call(facade, Request::NetworkParameters(hash)).await? {
                        Response::NetworkParameters(parameters) => {
                            Message::NetworkParameters(parameters)
                        }
                        response => {
                            return Err(mismatched_response("network parameters", response))
                        }
                    }
                }
                Message::GetTrustedClassAttachments(class_name) => {
                    match facade_call(facade, Request::TrustedClassAttachments(class_name)).await?
                    {
                        Response::TrustedClassAttachments(ids) => {
                            Message::TrustedClassAttachments(ids)
                        }
                        response => {
                            return Err(mismatched_response("trusted class attachments", response))
                        }
                    }
                }
                Message::VerificationResult(outcome) => return Ok(outcome),
                message @ (Message::Initialisation { .. }
                | Message::VerificationRequest { .. }
                | Message::Parties(_)
                | Message::Attachment(_)
                | Message::Attachments(_)
                | Message::NetworkParameters(_)
                | Message::TrustedClassAttachments(_)) => {
                    return Err(SessionError::UnexpectedMessage(Box::new(message)));
                }
            };

            trace!(%reply, "answering verifier sub-request");
            self.stream.send(reply).await?;
        }
    }

    /// Close the connection, then kill the verifier process and wait for
    /// it to be reaped.
    ///
    /// Close failures are logged and swallowed: the process is about to be
    /// killed regardless, so a connection that would not shut down cleanly
    /// changes nothing.
    pub(super) async fn close(mut self) {
        if let Err(error) = self.stream.close().await {
            debug!(%error, "error closing the verifier connection");
        }

        let (done_tx, done_rx) = oneshot::channel();
        if self.exit_tx.send(done_tx).is_ok() {
            // Wait for the monitor to reap the process, so callers observe
            // a fully terminated sandbox.
            let _ = done_rx.await;
        }
    }
}

#[cfg(all(test, unix))]
impl Session {
    /// A session with a dangling connection and no process, for tests of
    /// the shared session slot.
    pub(super) fn disconnected(id: u64) -> Session {
        let (stream, _peer) =
            tokio::net::UnixStream::pair().expect("socket pair creation works");
        let (exit_tx, _exit_rx) = oneshot::channel();

        Session {
            id,
            stream: Framed::new(
                tokio_util::either::Either::Right(stream),
                Codec::builder().finish(),
            ),
            exit_tx,
        }
    }
}

/// Ask the node's data facade one question.
async fn facade_call<S>(facade: &mut S, request: Request) -> Result<Response, SessionError>
where
    S: Service<Request, Response = Response, Error = BoxError> + Send + 'static,
    S::Future: Send,
{
    facade
        .ready()
        .await
        .map_err(SessionError::Facade)?
        .call(request)
        .await
        .map_err(SessionError::Facade)
}

/// The facade answered a different question than it was asked.
fn mismatched_response(expected: &str, response: Response) -> SessionError {
    SessionError::Facade(format!("facade returned {response:?} to a request for {expected}").into())
}

/// Owns a verifier process for the lifetime of its session.
///
/// If the process exits on its own, the shared slot entry for this session
/// is cleared so the next verification starts over with a fresh process.
/// Otherwise the monitor waits for the session to request a kill, or to
/// imply one by dropping its channel, and reaps the process.
async fn exit_monitor(
    mut process: Box<dyn SandboxProcess>,
    mut exit_rx: oneshot::Receiver<oneshot::Sender<()>>,
    session_id: u64,
    slot: SessionSlot,
) {
    let kill_request = tokio::select! {
        status = process.wait() => {
            if slot.clear_if(session_id) {
                warn!(?status, "verifier process exited unexpectedly");
            } else {
                debug!(?status, "verifier process exited");
            }
            return;
        }
        kill_request = &mut exit_rx => kill_request,
    };

    if let Err(error) = process.start_kill() {
        // Processes that already exited report an error here; there is
        // nothing left to kill either way.
        debug!(%error, "error killing the verifier process");
    }
    let status = process.wait().await;
    debug!(?status, "verifier process terminated");

    if let Ok(done_tx) = kill_request {
        let _ = done_tx.send(());
    }
}
