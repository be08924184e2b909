//! Supervision of out-of-process transaction verification.
//!
//! The [`Supervisor`] owns at most one sandboxed verifier process at a
//! time. Verifications borrow that process for one full request/response
//! exchange each; if the process crashes or breaks protocol mid-exchange,
//! the supervisor discards it and retries the transaction on a fresh one.

use std::{
    collections::BTreeMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tower::Service;
use tracing::Span;
use tracing_futures::Instrument;

use okapi_chain::transaction::{SerializedState, SerializedTransaction, StateRef};

use crate::{
    config::Config,
    constants,
    error::{SessionError, VerificationError, VerifyError},
    protocol::internal::{Request, Response},
    sandbox::{
        launch::{ExecutableLauncher, Launcher},
        transport::Listener,
    },
    BoxError,
};

mod session;

use session::Session;

/// A shared slot holding the session to be reused by the next
/// verification.
///
/// The slot is the one piece of session state touched from outside the
/// verification lock: each session's exit monitor clears it when its
/// process dies unasked, and [`Supervisor::close`] empties it, both
/// possibly while a verification is in flight.
#[derive(Clone, Default)]
struct SessionSlot(Arc<Mutex<Option<Session>>>);

impl SessionSlot {
    /// Take the parked session, if there is one.
    fn take(&self) -> Option<Session> {
        self.0
            .lock()
            .expect("session slot mutex should be unpoisoned")
            .take()
    }

    /// Park a session for the next verification.
    fn put(&self, session: Session) {
        *self
            .0
            .lock()
            .expect("session slot mutex should be unpoisoned") = Some(session);
    }

    /// Clear the slot, but only if it still holds the given session, and
    /// report whether it did.
    ///
    /// The exit monitor calls this when its process dies on its own. By
    /// the time the monitor runs, the supervisor may already have parked a
    /// replacement session, and an unconditional clear would throw that
    /// replacement away.
    fn clear_if(&self, session_id: u64) -> bool {
        let mut slot = self
            .0
            .lock()
            .expect("session slot mutex should be unpoisoned");
        if slot.as_ref().map(Session::id) == Some(session_id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

/// Supervises a sandboxed transaction verifier process.
///
/// Verifications are fully serialized: the wire protocol has no request
/// identifiers, so only one exchange can be in flight at a time, and
/// concurrent callers block until the exchange ahead of them finishes.
pub struct Supervisor<S, L = ExecutableLauncher> {
    /// The node-side data facade, locked for the duration of one
    /// verification exchange.
    ///
    /// Holding this lock across the whole exchange is what serializes
    /// callers.
    facade: tokio::sync::Mutex<S>,

    /// The rendezvous listener the verifier process connects back over,
    /// bound lazily by the first verification.
    listener: Mutex<Option<Arc<Listener>>>,

    /// The session parked between verifications.
    slot: SessionSlot,

    /// Launches verifier processes.
    launcher: L,

    /// Supervision settings, shared with every launched process.
    config: Config,

    /// The identifier for the next session.
    next_session_id: AtomicU64,

    /// Set once [`Supervisor::close`] has started.
    closed: AtomicBool,

    /// Set once a host-exit hook has been registered.
    exit_hook: AtomicBool,
}

impl<S> Supervisor<S> {
    /// Create a supervisor that launches the verifier executable named by
    /// `config`.
    pub fn new(config: Config, facade: S) -> Self {
        let launcher = ExecutableLauncher::new(&config);
        Supervisor::with_launcher(config, facade, launcher)
    }
}

impl<S, L> Supervisor<S, L> {
    /// Create a supervisor with a custom process launcher.
    pub fn with_launcher(config: Config, facade: S, launcher: L) -> Self {
        Supervisor {
            facade: tokio::sync::Mutex::new(facade),
            listener: Mutex::new(None),
            slot: SessionSlot::default(),
            launcher,
            config,
            next_session_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            exit_hook: AtomicBool::new(false),
        }
    }
}

impl<S, L> Supervisor<S, L>
where
    S: Service<Request, Response = Response, Error = BoxError> + Send + 'static,
    S::Future: Send,
    L: Launcher,
{
    /// Verify one transaction in the sandboxed verifier.
    ///
    /// Infrastructure faults (a crashed process, a broken connection, a
    /// corrupt frame) are retried on a fresh process, up to
    /// [`constants::MAX_VERIFY_ATTEMPTS`] attempts in total. The
    /// verifier's verdict is final either way: a rejected transaction is
    /// reported as [`VerifyError::Invalid`] and is never retried, because
    /// resubmitting it would only produce the same answer.
    pub async fn verify(
        &self,
        transaction: SerializedTransaction,
        states: BTreeMap<StateRef, SerializedState>,
    ) -> Result<(), VerifyError> {
        // The wire protocol has no request identifiers, so one exchange
        // must fully finish before the next may start. Holding the facade
        // lock for the whole call is what enforces that.
        let mut facade = self.facade.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(VerifyError::Closed);
        }

        let listener = self.listener_or_bind().await?;

        let mut attempt = 1;
        loop {
            let fault = match self
                .attempt_verification(&listener, &mut facade, &transaction, &states)
                .await
            {
                Ok(outcome) => return outcome.map_err(VerifyError::Invalid),
                Err(fault) => fault,
            };

            if attempt == constants::MAX_VERIFY_ATTEMPTS {
                return Err(VerifyError::Unavailable {
                    attempts: attempt,
                    source: fault,
                });
            }

            if self.closed.load(Ordering::SeqCst) {
                // close() ran mid-exchange; don't launch replacements for
                // a supervisor that is shutting down.
                return Err(VerifyError::Closed);
            }

            warn!(%fault, attempt, "verification attempt failed, restarting the verifier");
            metrics::counter!("okapi.verifier.session.restarts.total", 1);
            attempt += 1;
        }
    }

    /// Run one verification exchange on the parked session, or on a newly
    /// connected one if nothing is parked.
    ///
    /// On success the session is parked again for the next verification.
    /// On a fault the session is destroyed: the connection is in an
    /// unknown state, and the protocol has no way to resynchronize it.
    async fn attempt_verification(
        &self,
        listener: &Listener,
        facade: &mut S,
        transaction: &SerializedTransaction,
        states: &BTreeMap<StateRef, SerializedState>,
    ) -> Result<Result<(), VerificationError>, SessionError> {
        let mut session = match self.slot.take() {
            Some(session) => session,
            None => {
                let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
                Session::connect(
                    id,
                    listener,
                    &self.launcher,
                    &self.config,
                    facade,
                    self.slot.clone(),
                )
                .await?
            }
        };

        match session
            .verify_transaction(facade, transaction.clone(), states.clone())
            .await
        {
            Ok(outcome) => {
                if self.closed.load(Ordering::SeqCst) {
                    // close() ran during this exchange and could not see
                    // this session; parking it now would leak the process.
                    session.close().await;
                } else {
                    self.slot.put(session);
                }
                Ok(outcome)
            }
            Err(fault) => {
                session.close().await;
                Err(fault)
            }
        }
    }

    /// The rendezvous listener, bound on first use.
    ///
    /// The listener must be live before any verifier process is spawned,
    /// so even the fastest-starting process finds it there.
    async fn listener_or_bind(&self) -> Result<Arc<Listener>, VerifyError> {
        if let Some(listener) = self
            .listener
            .lock()
            .expect("listener mutex should be unpoisoned")
            .as_ref()
        {
            return Ok(listener.clone());
        }

        let listener = Listener::bind(self.config.transport)
            .await
            .map_err(|error| VerifyError::Unavailable {
                attempts: 1,
                source: SessionError::Io(error),
            })?;
        let listener = Arc::new(listener);

        let mut stored = self
            .listener
            .lock()
            .expect("listener mutex should be unpoisoned");
        if self.closed.load(Ordering::SeqCst) {
            // close() ran while the listener was being bound; a listener
            // parked after it would never be cleaned up.
            return Err(VerifyError::Closed);
        }
        *stored = Some(listener.clone());
        drop(stored);

        Ok(listener)
    }

    /// Shut the supervisor down.
    ///
    /// Kills the parked verifier process if there is one, then closes the
    /// rendezvous listener, removing any socket file it created. Closing
    /// again does nothing, so an explicit `close` and a host-exit hook can
    /// coexist safely. `close` does not wait for an in-flight
    /// verification; that verification finishes normally and its session
    /// is destroyed when it completes.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("shutting down the verifier supervisor");

        if let Some(session) = self.slot.take() {
            session.close().await;
        }

        // Dropping the listener closes the socket, and for unix
        // transports removes the socket file and its directory.
        let listener = self
            .listener
            .lock()
            .expect("listener mutex should be unpoisoned")
            .take();
        drop(listener);
    }

    /// Close the supervisor when `host_exit` resolves.
    ///
    /// Call this on a cheap [`Arc`] clone of the shared supervisor handle.
    /// The hook is registered at most once per supervisor; later calls do
    /// nothing. The hook holds only a weak reference, so it does not keep
    /// a dropped supervisor alive, and firing after the supervisor is
    /// gone does nothing.
    pub fn close_on_host_exit<F>(self: Arc<Self>, host_exit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.exit_hook.swap(true, Ordering::SeqCst) {
            return;
        }

        let supervisor = Arc::downgrade(&self);
        tokio::spawn(
            async move {
                host_exit.await;
                if let Some(supervisor) = supervisor.upgrade() {
                    supervisor.close().await;
                }
            }
            .instrument(Span::current()),
        );
    }
}

impl<S, L> Drop for Supervisor<S, L> {
    fn drop(&mut self) {
        // Dropping a parked session drops its channel to the exit
        // monitor, which kills the process without an async close.
        drop(self.slot.take());
    }
}
