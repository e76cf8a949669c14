//! Lifecycle controller and request correlation for one subordinate process.
//!
//! # Architecture
//!
//! A [`Connection`] owns at most one live session. A session bundles:
//! - the child process (exclusively owned, killed on drop)
//! - a [`ResponseRouter`] holding the pending-request table
//! - a writer task fed by a bounded queue (single writer to stdin)
//! - a reader task routing stdout responses to waiters
//! - the request ID counter (restarts at 1 for each session)
//!
//! Request flow:
//! 1. Allocate the next ID and register it with the router
//! 2. Queue the encoded line for the writer task
//! 3. Await the oneshot receiver under the request timeout (no lock held)
//!
//! Teardown happens on `disconnect`, on connect failure, or when the reader
//! task sees stdout end. Each session carries an epoch so a reader that
//! outlives its session cannot tear down a newer one.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::{broadcast, mpsc, watch};

use super::actor::{
    OUTBOUND_QUEUE_CAPACITY, OutboundMessage, ReaderEvent, ReaderTaskHandle, ResponseRouter,
    WriterTaskHandle, spawn_reader_task, spawn_writer_task,
};
use super::connection_state::ConnectionState;
use super::events::{ConnectionEvent, DisconnectReason, EVENT_CHANNEL_CAPACITY};
use super::protocol::{JsonRpcRequest, Params, RequestId, TOOLS_LIST_METHOD};
use super::transport::{
    SpawnedProcess, SubordinateCommand, TERMINATE_GRACE, spawn_subordinate, terminate,
};
use crate::error::{BridgeError, BridgeResult, LockResultExt};

/// Default bound on a single call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on reaching `Connected`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// How to start and supervise the subordinate process.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub command: SubordinateCommand,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Issue `tools/list` during connect instead of only waiting passively
    /// for a successful result.
    pub readiness_probe: bool,
    /// Time between SIGTERM and SIGKILL on teardown.
    pub terminate_grace: Duration,
}

impl ConnectionConfig {
    /// Config with default timeouts and the readiness probe enabled.
    pub fn new(command: SubordinateCommand) -> Self {
        Self {
            command,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            readiness_probe: true,
            terminate_grace: TERMINATE_GRACE,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_readiness_probe(mut self, enabled: bool) -> Self {
        self.readiness_probe = enabled;
        self
    }

    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }
}

/// Correlated request/response channel to one subordinate process.
///
/// Share it between tasks behind an `Arc`; every method takes `&self`.
/// Dropping a `Connection` without `disconnect` still kills the child.
pub struct Connection {
    shared: Arc<Shared>,
}

struct Shared {
    config: ConnectionConfig,
    /// Uses std::sync::RwLock for fast, synchronous state checks
    state: RwLock<ConnectionState>,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<ConnectionEvent>,
    next_epoch: AtomicU64,
}

/// Everything a live session owns.
struct Session {
    epoch: u64,
    child: Child,
    link: SessionLink,
    reader: ReaderTaskHandle,
    writer: WriterTaskHandle,
}

/// The parts of a session a caller needs, cloned out so no lock is held
/// while awaiting.
#[derive(Clone)]
struct SessionLink {
    router: Arc<ResponseRouter>,
    outbound: mpsc::Sender<OutboundMessage>,
    next_request_id: Arc<AtomicI64>,
}

/// Removes a call's router entry when the call ends, including when its
/// future is dropped before completing.
struct PendingGuard<'a> {
    router: &'a ResponseRouter,
    request_id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        // No-op once the response has been routed
        if self.router.remove(self.request_id) {
            debug!(
                target: "tweetbridge::bridge::connection",
                "Dropped pending request id={}",
                self.request_id
            );
        }
    }
}

/// Which state a call may be issued in.
#[derive(Debug, Clone, Copy)]
enum CallGate {
    Connected,
    /// Readiness probe of the given session while it is still connecting
    Probe(u64),
}

impl From<ReaderEvent> for DisconnectReason {
    fn from(event: ReaderEvent) -> Self {
        match event {
            ReaderEvent::Eof => DisconnectReason::ProcessExited,
            ReaderEvent::Error(message) => DisconnectReason::ReadError(message),
        }
    }
}

impl Connection {
    /// Create a connection in `Disconnected` state. Nothing is spawned yet.
    pub fn new(config: ConnectionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                session: Mutex::new(None),
                events,
                next_epoch: AtomicU64::new(1),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Number of calls awaiting a response in the current session.
    pub fn pending_count(&self) -> usize {
        self.shared
            .session
            .lock()
            .recover_poison("Connection::pending_count")
            .as_ref()
            .map_or(0, |session| session.link.router.pending_count())
    }

    /// Spawn the subordinate and wait until it is ready.
    ///
    /// # Errors
    /// - `AlreadyConnected` unless the state is `Disconnected`
    /// - `Spawn` / `Config` if the process cannot be started
    /// - `ConnectionClosed` if the process exits before becoming ready
    /// - `ConnectionTimeout` if readiness is not observed within the connect
    ///   timeout; the process has been terminated by then
    pub async fn connect(&self) -> BridgeResult<()> {
        let (epoch, ready_rx) = self.shared.start_session()?;
        let connect_timeout = self.shared.config.connect_timeout;

        let outcome =
            match tokio::time::timeout(connect_timeout, self.shared.await_ready(epoch, ready_rx))
                .await
            {
                Ok(Ok(())) => {
                    if self.shared.mark_connected(epoch) {
                        return Ok(());
                    }
                    Err(BridgeError::ConnectionClosed)
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(BridgeError::ConnectionTimeout {
                    timeout: connect_timeout,
                }),
            };

        if let Err(e) = &outcome {
            warn!(
                target: "tweetbridge::bridge::connection",
                "Connect failed: {}",
                e
            );
        }
        self.shared
            .teardown(Some(epoch), DisconnectReason::ConnectFailed)
            .await;
        outcome
    }

    /// Terminate the subordinate and fail every pending call with
    /// `ConnectionClosed`.
    ///
    /// Safe to call repeatedly and before `connect`.
    pub async fn disconnect(&self) {
        self.shared.teardown(None, DisconnectReason::Requested).await;
    }

    /// Send one request and wait for its correlated response.
    ///
    /// # Errors
    /// - `NotConnected` unless the state is `Connected`
    /// - `Remote` if the subordinate answered with an error descriptor
    /// - `RequestTimeout` if no response arrived within the request timeout;
    ///   the connection stays usable
    /// - `ConnectionClosed` if the session ended first
    pub async fn call(&self, method: &str, params: Params) -> BridgeResult<Value> {
        self.shared.call(CallGate::Connected, method, params).await
    }
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.read().recover_poison("Connection::state")
    }

    fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().recover_poison("Connection::set_state");
        if *state != new_state {
            debug!(
                target: "tweetbridge::bridge::connection",
                "State {} -> {}",
                *state,
                new_state
            );
            *state = new_state;
        }
    }

    /// Spawn the process and its tasks, moving to `Connecting`.
    ///
    /// Runs entirely under the session lock, so concurrent `connect` calls
    /// cannot both succeed.
    fn start_session(self: &Arc<Self>) -> BridgeResult<(u64, watch::Receiver<bool>)> {
        let mut slot = self.session.lock().recover_poison("Connection::start_session");
        if slot.is_some() || self.state() != ConnectionState::Disconnected {
            return Err(BridgeError::AlreadyConnected);
        }

        let SpawnedProcess {
            child,
            writer,
            reader,
        } = spawn_subordinate(&self.config.command)?;

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let router = Arc::new(ResponseRouter::new());
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = watch::channel(false);

        let writer = spawn_writer_task(writer, outbound_rx, Arc::clone(&router));
        let weak = Arc::downgrade(self);
        let reader = spawn_reader_task(
            reader,
            Arc::clone(&router),
            ready_tx,
            move |event| async move {
                if let Some(shared) = weak.upgrade() {
                    shared.teardown(Some(epoch), event.into()).await;
                }
            },
        );

        *slot = Some(Session {
            epoch,
            child,
            link: SessionLink {
                router,
                outbound,
                next_request_id: Arc::new(AtomicI64::new(1)),
            },
            reader,
            writer,
        });
        self.set_state(ConnectionState::Connecting);

        info!(
            target: "tweetbridge::bridge::connection",
            "Started subordinate {} (session {})",
            self.config.command.program(),
            epoch
        );
        Ok((epoch, ready_rx))
    }

    /// Resolve once the session is ready.
    ///
    /// Passive readiness (any successful result) races the probe; whichever
    /// comes first wins. A probe rejected by the subordinate leaves only the
    /// passive path.
    async fn await_ready(
        &self,
        epoch: u64,
        mut ready_rx: watch::Receiver<bool>,
    ) -> BridgeResult<()> {
        // The sender lives in the reader task, so an error means stdout ended
        let passive = async move {
            ready_rx
                .wait_for(|ready| *ready)
                .await
                .map(|_| ())
                .map_err(|_| BridgeError::ConnectionClosed)
        };
        tokio::pin!(passive);

        if !self.config.readiness_probe {
            return passive.await;
        }

        let probe = self.call(CallGate::Probe(epoch), TOOLS_LIST_METHOD, Params::new());
        tokio::select! {
            biased;

            ready = &mut passive => ready,

            probed = probe => match probed {
                Ok(_) => Ok(()),
                Err(BridgeError::ConnectionClosed) => Err(BridgeError::ConnectionClosed),
                Err(e) => {
                    debug!(
                        target: "tweetbridge::bridge::connection",
                        "Readiness probe failed: {}, waiting for a successful result",
                        e
                    );
                    passive.await
                }
            },
        }
    }

    /// `Connecting` -> `Connected` if the session is still the same one.
    fn mark_connected(&self, epoch: u64) -> bool {
        let slot = self.session.lock().recover_poison("Connection::mark_connected");
        let current = slot.as_ref().is_some_and(|session| session.epoch == epoch);
        if !current || self.state() != ConnectionState::Connecting {
            return false;
        }
        self.set_state(ConnectionState::Connected);
        let _ = self.events.send(ConnectionEvent::Connected);
        true
    }

    fn session_link(&self, gate: CallGate) -> BridgeResult<SessionLink> {
        let slot = self.session.lock().recover_poison("Connection::session_link");
        let Some(session) = slot.as_ref() else {
            return Err(BridgeError::NotConnected);
        };
        let accepted = match gate {
            CallGate::Connected => self.state() == ConnectionState::Connected,
            CallGate::Probe(epoch) => {
                session.epoch == epoch && self.state() == ConnectionState::Connecting
            }
        };
        if accepted {
            Ok(session.link.clone())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    async fn call(&self, gate: CallGate, method: &str, params: Params) -> BridgeResult<Value> {
        let link = self.session_link(gate)?;
        let request_id = RequestId::new(link.next_request_id.fetch_add(1, Ordering::Relaxed));
        let line = JsonRpcRequest::new(request_id, method, params).to_line()?;
        let response_rx = link.router.register(request_id, method)?;
        let _pending = PendingGuard {
            router: &link.router,
            request_id,
        };

        debug!(
            target: "tweetbridge::bridge::connection",
            "Sending request id={} method={}",
            request_id,
            method
        );

        // The timer covers queueing too, so a stalled writer cannot hang callers
        let exchange = async {
            link.outbound
                .send(OutboundMessage { line, request_id })
                .await
                .map_err(|_| BridgeError::ConnectionClosed)?;
            response_rx
                .await
                .unwrap_or(Err(BridgeError::ConnectionClosed))
        };

        let request_timeout = self.config.request_timeout;
        match tokio::time::timeout(request_timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    target: "tweetbridge::bridge::connection",
                    "Request id={} ({}) timed out after {:?}",
                    request_id,
                    method,
                    request_timeout
                );
                Err(BridgeError::RequestTimeout {
                    id: request_id,
                    timeout: request_timeout,
                })
            }
        }
    }

    /// Tear down the session, if any.
    ///
    /// With `Some(epoch)`, only that session is torn down. Returns whether a
    /// session was actually torn down (and an event emitted).
    async fn teardown(&self, epoch: Option<u64>, reason: DisconnectReason) -> bool {
        let session = {
            let mut slot = self.session.lock().recover_poison("Connection::teardown");
            let matches = match (slot.as_ref(), epoch) {
                (None, _) => false,
                (Some(session), Some(epoch)) => session.epoch == epoch,
                (Some(_), None) => true,
            };
            if !matches {
                return false;
            }
            // Under the session lock so no call can slip in between
            self.set_state(ConnectionState::Disconnected);
            slot.take()
        };
        let Some(mut session) = session else {
            return false;
        };

        session.reader.cancel();
        session.writer.cancel();
        let failed_requests = session.link.router.close();
        terminate(&mut session.child, self.config.terminate_grace).await;

        match reason {
            DisconnectReason::ProcessExited | DisconnectReason::ReadError(_) => warn!(
                target: "tweetbridge::bridge::connection",
                "Subordinate went away ({:?}), failed {} pending request(s)",
                reason,
                failed_requests
            ),
            DisconnectReason::Requested | DisconnectReason::ConnectFailed => info!(
                target: "tweetbridge::bridge::connection",
                "Session {} closed ({:?}), failed {} pending request(s)",
                session.epoch,
                reason,
                failed_requests
            ),
        }
        let _ = self.events.send(ConnectionEvent::Disconnected {
            reason,
            failed_requests,
        });
        true
    }
}
