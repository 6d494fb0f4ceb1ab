//! Session client façade (§4.E): the single entry point most callers use.
//! Owns the runspace pool, the backend collaborator seams, and every
//! resilience primitive (§4.F), wiring them together the way the teacher's
//! `ironposh-client-core::connector` wires a TLS stream, a PSRP pool, and a
//! reconnect task — generalized here into one blocking façade instead of an
//! async connector/host pair.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use psrp_protocol::{
    ErrorRecord, InformationRecord, PipelineOutput, ProgressRecord, PsPrimitiveValue, PsValue,
    RunspacePoolState,
};
use psrp_winrm::requests::RequestContext;

use crate::backend::hvsocket::{
    broker_handshake, server_handshake, HvSocketBackend, BROKER_SERVICE_GUID, SERVER_SERVICE_GUID,
};
use crate::backend::wsman::WsManBackend;
use crate::backend::{BackendHealth, ByteStreamAdapter, HttpTransport, HvSocketConnector};
use crate::clock::{SharedClock, SystemClock};
use crate::config::{ClientConfig, Transport};
use crate::credentials::Credentials;
use crate::error::ClientError;
use crate::file_transfer::{ScriptExecutor, StreamHandle, StreamingExecutor};
use crate::pipeline::{PipelineChannels, PipelineSpec};
use crate::pool::{RunspacePool, RunspacePoolConfig};
use crate::resilience::{retry_with_backoff, CircuitBreaker, KeepaliveTicker, ReconnectMonitor};
use crate::security_log::{Outcome, SecurityEvent, SecurityEventType, SecurityLogger};

/// A runspace slot, released back to the gate when dropped. Held across an
/// `execute_stream` call's return boundary in [`Session::pending_permits`].
struct RunspacePermit {
    token_tx: Sender<()>,
}

impl Drop for RunspacePermit {
    fn drop(&mut self) {
        let _ = self.token_tx.send(());
    }
}

/// Bounds in-flight pipelines to `max_runspaces`, honoring `max_queue_size`
/// (§6: `-1` unbounded queueing, `0` reject-when-saturated, `N` a bounded
/// wait-list) the same way `ClientConfig` documents it.
struct RunspaceGate {
    token_tx: Sender<()>,
    token_rx: Receiver<()>,
    queue_limit: i64,
    waiting: AtomicI64,
}

impl RunspaceGate {
    fn new(max_runspaces: u32, queue_limit: i64) -> Self {
        let capacity = max_runspaces.max(1) as usize;
        let (token_tx, token_rx) = crossbeam_channel::bounded(capacity);
        for _ in 0..capacity {
            let _ = token_tx.send(());
        }
        Self {
            token_tx,
            token_rx,
            queue_limit,
            waiting: AtomicI64::new(0),
        }
    }

    fn acquire(&self, timeout: Duration) -> Result<RunspacePermit, ClientError> {
        let grant = |_: ()| RunspacePermit {
            token_tx: self.token_tx.clone(),
        };

        if self.queue_limit == 0 {
            return self
                .token_rx
                .try_recv()
                .map(grant)
                .map_err(|_| ClientError::QueueFull);
        }

        if self.queue_limit > 0 {
            let current = self.waiting.fetch_add(1, Ordering::SeqCst);
            if current >= self.queue_limit {
                self.waiting.fetch_sub(1, Ordering::SeqCst);
                return Err(ClientError::QueueFull);
            }
            let result = self.token_rx.recv_timeout(timeout);
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            return result
                .map(grant)
                .map_err(|_| ClientError::AcquireTimeout(timeout));
        }

        self.token_rx
            .recv_timeout(timeout)
            .map(grant)
            .map_err(|_| ClientError::AcquireTimeout(timeout))
    }
}

/// Keeps the pool's dispatch loop running on a dedicated thread so pipeline
/// output is drained and pipeline-state transitions observed even while the
/// calling thread blocks on `wait()` (§4.C "pump").
struct DispatchLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchLoop {
    fn start(pool: Arc<Mutex<Option<RunspacePool>>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_loop = stop.clone();
        let handle = std::thread::spawn(move || {
            while !stop_loop.load(Ordering::Relaxed) {
                let progressed = {
                    let mut guard = pool.lock().expect("pool lock poisoned");
                    match guard.as_mut() {
                        Some(p) => p.pump_once().unwrap_or(false),
                        None => false,
                    }
                };
                if !progressed {
                    std::thread::sleep(Duration::from_millis(20));
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DispatchLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Whether `Session::close` waits for a graceful pool-state-closed
/// round trip or tears the backend down immediately (§4.E "close").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStrategy {
    Graceful,
    Force,
}

/// Aggregated result of a one-shot `execute` call: every stream drained
/// after the pipeline reaches a terminal state (§4.D, §4.E).
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub output: Vec<PipelineOutput>,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<PsValue>,
    pub verbose: Vec<PsValue>,
    pub debug: Vec<PsValue>,
    pub progress: Vec<ProgressRecord>,
    pub information: Vec<InformationRecord>,
    pub had_errors: bool,
}

/// Secrets never round-trip through persisted state (§4.H); only enough is
/// kept to reattach to a still-live server-side pool or HvSocket session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSessionState {
    pub pool_id: Uuid,
    pub message_id: u64,
    pub target: String,
    pub transport: Transport,
    pub shell_id: Option<String>,
}

/// The session façade (§4.E). Every method takes `&self`: internal mutable
/// state lives behind `Mutex`es so a session can be shared across threads
/// (e.g. one thread driving `execute` while another watches health).
pub struct Session {
    target: String,
    config: ClientConfig,
    credentials: Credentials,
    http_transport: Option<Arc<dyn HttpTransport>>,
    hvsocket_connector: Option<Arc<dyn HvSocketConnector>>,
    clock: SharedClock,
    security_logger: SecurityLogger,
    pool: Arc<Mutex<Option<RunspacePool>>>,
    dispatch_loop: Mutex<Option<DispatchLoop>>,
    /// Monotonic message-id counter (§3, §4.E), 0 until the first successful
    /// `connect`, then 2 and incremented once per successful `execute` call
    /// (Testable Property 3: after N successful executes it equals `2 + N`).
    message_id: AtomicU64,
    gate: RunspaceGate,
    circuit_breaker: CircuitBreaker,
    reconnect_monitor: Mutex<Option<ReconnectMonitor>>,
    keepalive: Mutex<Option<KeepaliveTicker>>,
    pending_permits: Mutex<HashMap<Uuid, RunspacePermit>>,
}

impl Session {
    /// Builds a session against `target` (a bare host name or IP; port and
    /// scheme come from `config`). Validates `config` eagerly so bad
    /// configuration is reported before any I/O is attempted (§1 "Config").
    /// `http_transport` is required for `Transport::WSMan`, `hvsocket_connector`
    /// for `Transport::HvSocket` — neither is constructed here, only stored.
    pub fn new(
        target: impl Into<String>,
        config: ClientConfig,
        credentials: Credentials,
        http_transport: Option<Arc<dyn HttpTransport>>,
        hvsocket_connector: Option<Arc<dyn HvSocketConnector>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let clock: SharedClock = Arc::new(SystemClock);
        let circuit_breaker = CircuitBreaker::new(config.circuit_breaker.clone(), clock.clone());
        let gate = RunspaceGate::new(config.max_runspaces, config.max_queue_size);

        Ok(Self {
            target: target.into(),
            credentials,
            http_transport,
            hvsocket_connector,
            clock,
            security_logger: SecurityLogger::new(),
            pool: Arc::new(Mutex::new(None)),
            dispatch_loop: Mutex::new(None),
            message_id: AtomicU64::new(0),
            gate,
            circuit_breaker,
            reconnect_monitor: Mutex::new(None),
            keepalive: Mutex::new(None),
            pending_permits: Mutex::new(HashMap::new()),
            config,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// A handle onto this session's security logger, for callers wiring a
    /// [`crate::file_transfer::FileTransferEngine`] to emit transfer events
    /// under the same correlation id as the rest of the session (§4.H).
    pub fn security_logger(&self) -> SecurityLogger {
        self.security_logger.clone()
    }

    /// The session's monotonic message-id counter (§3, Testable Property 3).
    /// `0` before the first successful `connect`.
    pub fn message_id(&self) -> u64 {
        self.message_id.load(Ordering::SeqCst)
    }

    fn target_url(&self) -> String {
        format!(
            "http{s}://{host}:{port}/wsman",
            s = if self.config.use_tls { "s" } else { "" },
            host = self.target,
            port = self.config.resolved_port(),
        )
    }

    fn build_backend(&self) -> Result<Box<dyn ByteStreamAdapter>, ClientError> {
        match self.config.transport {
            Transport::WSMan => {
                let transport = self.http_transport.clone().ok_or_else(|| {
                    ClientError::ConfigInvalid(
                        "WSMan transport requires an HttpTransport".to_string(),
                    )
                })?;
                let mut context = RequestContext::new(self.target_url());
                context.resource_uri = self.config.resolved_resource_uri();
                context.operation_timeout = self.config.timeout;
                Ok(Box::new(WsManBackend::new(transport, context, self.config.timeout)))
            }
            Transport::HvSocket => {
                let connector = self.hvsocket_connector.clone().ok_or_else(|| {
                    ClientError::ConfigInvalid(
                        "HvSocket transport requires an HvSocketConnector".to_string(),
                    )
                })?;
                let broker_socket = connector.connect(BROKER_SERVICE_GUID)?;
                let token = broker_handshake(
                    broker_socket.as_ref(),
                    self.credentials.domain.as_deref(),
                    self.credentials.username.as_deref().unwrap_or_default(),
                    self.credentials.password.as_deref(),
                    Some(&self.config.resolved_configuration_name()),
                    self.config.timeout,
                )
                .inspect_err(|err| {
                    self.security_logger.emit(
                        SecurityEvent::new(SecurityEventType::Authentication, "hvsocket-broker", Outcome::Failure)
                            .target(&self.target)
                            .detail("error", err.to_string()),
                    );
                })?;

                let server_connector = connector.clone();
                let socket = server_handshake(&token, self.config.timeout, &self.clock, move || {
                    server_connector.connect(SERVER_SERVICE_GUID)
                })
                .inspect_err(|err| {
                    self.security_logger.emit(
                        SecurityEvent::new(SecurityEventType::Authentication, "hvsocket-server", Outcome::Failure)
                            .target(&self.target)
                            .detail("error", err.to_string()),
                    );
                })?;
                Ok(Box::new(HvSocketBackend::new(socket)))
            }
        }
    }

    fn open_backend(&self) -> Result<(), ClientError> {
        let backend = self.build_backend()?;
        let pool_config = RunspacePoolConfig {
            max_runspaces: self.config.max_runspaces as i32,
            ..RunspacePoolConfig::default()
        };
        let mut pool = RunspacePool::new(backend, pool_config);
        pool.open(self.config.timeout)?;
        *self.pool.lock().expect("pool lock poisoned") = Some(pool);
        Ok(())
    }

    /// Establishes the connection (§4.E "connect"): idempotent if already
    /// open. Retries transient failures per `config.retry`, and every
    /// attempt runs through the circuit breaker.
    pub fn connect(&self) -> Result<(), ClientError> {
        {
            let guard = self.pool.lock().expect("pool lock poisoned");
            if matches!(guard.as_ref(), Some(pool) if pool.is_open()) {
                return Ok(());
            }
        }

        let retry_policy = self.config.retry.clone();
        retry_with_backoff(&retry_policy, &self.clock, || {
            self.circuit_breaker.call(|| self.open_backend())
        })?;

        self.message_id.store(2, Ordering::SeqCst);
        self.start_dispatch_loop();
        if let Some(interval) = self.config.keep_alive_interval {
            self.start_keepalive(interval);
        }

        self.security_logger.emit(
            SecurityEvent::new(SecurityEventType::Connection, "connect", Outcome::Success)
                .target(&self.target),
        );
        Ok(())
    }

    /// Rebuilds a session from a previously `save_state`-d document (§4.E,
    /// §6): reattaches to a still-live WSMan shell by its `shell_id` without
    /// replaying `init-runspacepool`, matching `RunspacePool::connect`'s
    /// single-selector `Connect` rather than `Session::connect`'s `Create`.
    /// HvSocket sessions do not survive a socket loss (§3), so persisted
    /// state is only meaningful for `Transport::WSMan`.
    pub fn from_persisted(
        state: &PersistedSessionState,
        config: ClientConfig,
        credentials: Credentials,
        http_transport: Option<Arc<dyn HttpTransport>>,
        hvsocket_connector: Option<Arc<dyn HvSocketConnector>>,
    ) -> Result<Self, ClientError> {
        if state.transport != Transport::WSMan {
            return Err(ClientError::ConfigInvalid(
                "persisted session reattachment is only supported over WSMan".to_string(),
            ));
        }
        let shell_id = state.shell_id.clone().ok_or_else(|| {
            ClientError::ConfigInvalid("persisted state is missing a shell id".to_string())
        })?;

        let session = Self::new(
            state.target.clone(),
            config,
            credentials,
            http_transport,
            hvsocket_connector,
        )?;
        session.reattach_from_shell_id(&shell_id)?;
        session.message_id.store(state.message_id, Ordering::SeqCst);
        Ok(session)
    }

    /// Builds a fresh `WsManBackend` primed with a known `shell_id` and
    /// connects a new pool over it, without going through `open_backend`'s
    /// `Create` path (used only by `from_persisted`).
    fn reattach_from_shell_id(&self, shell_id: &str) -> Result<(), ClientError> {
        let transport = self.http_transport.clone().ok_or_else(|| {
            ClientError::ConfigInvalid("WSMan transport requires an HttpTransport".to_string())
        })?;
        let mut context = RequestContext::new(self.target_url());
        context.resource_uri = self.config.resolved_resource_uri();
        context.operation_timeout = self.config.timeout;
        let backend = WsManBackend::new(transport, context, self.config.timeout).with_shell_id(shell_id);

        let pool_config = RunspacePoolConfig {
            max_runspaces: self.config.max_runspaces as i32,
            ..RunspacePoolConfig::default()
        };
        let mut pool = RunspacePool::new(Box::new(backend), pool_config);
        pool.connect(self.config.timeout)?;
        *self.pool.lock().expect("pool lock poisoned") = Some(pool);

        self.start_dispatch_loop();
        if let Some(interval) = self.config.keep_alive_interval {
            self.start_keepalive(interval);
        }
        Ok(())
    }

    fn start_dispatch_loop(&self) {
        let mut guard = self.dispatch_loop.lock().expect("dispatch loop lock poisoned");
        if guard.is_none() {
            *guard = Some(DispatchLoop::start(self.pool.clone()));
        }
    }

    /// Sends a keepalive tick by driving the dispatcher: there is no
    /// dedicated PSRP keepalive message, so this simply keeps the
    /// transport's receive loop active on a fixed cadence (§4.F).
    fn start_keepalive(&self, interval: Duration) {
        let pool = self.pool.clone();
        let ticker = KeepaliveTicker::start(interval, self.clock.clone(), move || {
            let mut guard = match pool.lock() {
                Ok(guard) => guard,
                Err(_) => return false,
            };
            match guard.as_mut() {
                Some(p) => p.pump_once().is_ok(),
                None => false,
            }
        });
        *self.keepalive.lock().expect("keepalive lock poisoned") = Some(ticker);
    }

    /// Starts the background auto-reconnect monitor (§4.F). Requires the
    /// session to be held behind an `Arc`, since the monitor thread outlives
    /// this call. A no-op if `config.reconnect.enabled` is false.
    pub fn enable_auto_reconnect(self: &Arc<Self>) {
        if !self.config.reconnect.enabled {
            return;
        }
        let health_session = self.clone();
        let session = self.clone();
        let attempt_logger = self.security_logger.clone();
        let attempt_target = self.target.clone();
        let exhausted_logger = self.security_logger.clone();
        let exhausted_target = self.target.clone();
        let monitor = ReconnectMonitor::start(
            self.config.reconnect.clone(),
            self.clock.clone(),
            move || health_session.health(),
            move || session.reattach(),
            move |attempt| {
                attempt_logger.emit(
                    SecurityEvent::new(SecurityEventType::Reconnection, "attempt", Outcome::Attempt)
                        .target(&attempt_target)
                        .detail("attempt", attempt.to_string()),
                );
            },
            move || {
                exhausted_logger.emit(
                    SecurityEvent::new(SecurityEventType::Reconnection, "exhausted", Outcome::Failure)
                        .target(&exhausted_target),
                );
            },
        );
        *self
            .reconnect_monitor
            .lock()
            .expect("reconnect monitor lock poisoned") = Some(monitor);
    }

    /// Reattaches an open or lost connection (§4.E "reattach"). WSMan keeps
    /// the server-side pool alive across a transport loss, so this resumes
    /// it with `RunspacePool::connect`; HvSocket's guest-side session does
    /// not survive a socket loss, so this tears down and reopens entirely.
    pub fn reattach(&self) -> Result<(), ClientError> {
        match self.config.transport {
            Transport::WSMan => {
                let mut guard = self.pool.lock().expect("pool lock poisoned");
                let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
                pool.connect(self.config.timeout)?;
            }
            Transport::HvSocket => {
                {
                    let mut guard = self.pool.lock().expect("pool lock poisoned");
                    *guard = None;
                }
                self.open_backend()?;
            }
        }

        self.security_logger.emit(
            SecurityEvent::new(SecurityEventType::Reconnection, "reattach", Outcome::Success)
                .target(&self.target),
        );
        Ok(())
    }

    /// Releases the WSMan transport binding without tearing down the
    /// server-side pool (§4.C "disconnect"); HvSocket has no equivalent
    /// half-open state.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        if self.config.transport != Transport::WSMan {
            return Err(ClientError::ConfigInvalid(
                "disconnect is only meaningful over WSMan".to_string(),
            ));
        }
        let mut guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
        pool.disconnect()
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        let guard = self.pool.lock().expect("pool lock poisoned");
        match guard.as_ref() {
            Some(pool) if pool.is_open() => Ok(()),
            _ => Err(ClientError::NotConnected),
        }
    }

    fn spawn_pipeline(&self, script: &str) -> Result<(Uuid, PipelineChannels), ClientError> {
        let mut guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let id = pool.create_pipeline(PipelineSpec::script(script));
        pool.invoke_pipeline(id)?;
        let channels = pool.take_pipeline_channels(id).ok_or(ClientError::NotConnected)?;
        self.message_id.fetch_add(1, Ordering::SeqCst);
        self.security_logger.emit(
            SecurityEvent::new(SecurityEventType::Command, "invoke", Outcome::Attempt)
                .target(&self.target)
                .detail("pipeline_id", id.to_string()),
        );
        Ok((id, channels))
    }

    /// Starts `script` as a pipeline whose input stream stays open (§4.D
    /// "streaming input"), for [`StreamingExecutor::start_stream`].
    fn spawn_streaming_pipeline(&self, script: &str) -> Result<Uuid, ClientError> {
        let mut guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let id = pool.create_pipeline(PipelineSpec::streaming(script));
        pool.invoke_pipeline(id)?;
        self.message_id.fetch_add(1, Ordering::SeqCst);
        self.security_logger.emit(
            SecurityEvent::new(SecurityEventType::Command, "invoke-streaming", Outcome::Attempt)
                .target(&self.target)
                .detail("pipeline_id", id.to_string()),
        );
        Ok(id)
    }

    /// Blocks on a pipeline's completion channel without holding the pool
    /// lock, so the dispatcher thread can keep pumping while this call
    /// waits (§4.D "wait").
    fn wait_pipeline(&self, pipeline_id: Uuid, timeout: Duration) -> Result<(), ClientError> {
        let receiver = {
            let guard = self.pool.lock().expect("pool lock poisoned");
            let pool = guard.as_ref().ok_or(ClientError::NotConnected)?;
            pool.pipeline_completion_receiver(pipeline_id)
                .ok_or(ClientError::NotConnected)?
        };
        let result = match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ClientError::AcquireTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ClientError::PipelineFailed("pipeline dropped before completion".to_string()))
            }
        };

        let (subtype, outcome) = match &result {
            Ok(()) => ("complete", Outcome::Success),
            Err(_) => ("complete", Outcome::Failure),
        };
        let mut event = SecurityEvent::new(SecurityEventType::Command, subtype, outcome)
            .target(&self.target)
            .detail("pipeline_id", pipeline_id.to_string());
        if let Err(err) = &result {
            event = event.detail("error", err.to_string());
        }
        self.security_logger.emit(event);

        result
    }

    fn collect_result(channels: &PipelineChannels, had_errors_hint: bool) -> ExecutionResult {
        let mut result = ExecutionResult {
            had_errors: had_errors_hint,
            ..ExecutionResult::default()
        };
        while let Ok(item) = channels.output.try_recv() {
            result.output.push(item);
        }
        while let Ok(item) = channels.error.try_recv() {
            result.errors.push(item);
        }
        while let Ok(item) = channels.warning.try_recv() {
            result.warnings.push(item);
        }
        while let Ok(item) = channels.verbose.try_recv() {
            result.verbose.push(item);
        }
        while let Ok(item) = channels.debug.try_recv() {
            result.debug.push(item);
        }
        while let Ok(item) = channels.progress.try_recv() {
            result.progress.push(item);
        }
        while let Ok(item) = channels.information.try_recv() {
            result.information.push(item);
        }
        result.had_errors = result.had_errors || !result.errors.is_empty();
        result
    }

    /// Runs `script` as a one-shot pipeline and waits for it to finish
    /// (§4.E "execute"). Acquires a runspace slot first, honoring
    /// `max_queue_size`/`config.timeout` as the acquire timeout.
    pub fn execute(&self, script: &str) -> Result<ExecutionResult, ClientError> {
        let _permit = self.gate.acquire(self.config.timeout)?;
        self.ensure_connected()?;

        let (pipeline_id, channels) = self.circuit_breaker.call(|| self.spawn_pipeline(script))?;
        match self.wait_pipeline(pipeline_id, self.config.timeout) {
            Ok(()) => Ok(Self::collect_result(&channels, false)),
            Err(ClientError::PipelineFailed(_)) => Ok(Self::collect_result(&channels, true)),
            Err(other) => Err(other),
        }
    }

    /// Starts `script` without waiting (§4.E "execute_stream"): the caller
    /// drains `PipelineChannels` as it likes and later calls
    /// [`Session::wait_stream`] to observe completion and release the
    /// runspace slot this call acquired.
    pub fn execute_stream(&self, script: &str) -> Result<(Uuid, PipelineChannels), ClientError> {
        let permit = self.gate.acquire(self.config.timeout)?;
        self.ensure_connected()?;
        let (pipeline_id, channels) = self.spawn_pipeline(script)?;
        self.pending_permits
            .lock()
            .expect("permit map lock poisoned")
            .insert(pipeline_id, permit);
        Ok((pipeline_id, channels))
    }

    /// Waits for a pipeline started with `execute_stream` and releases the
    /// runspace slot it held, regardless of the wait's outcome.
    pub fn wait_stream(&self, pipeline_id: Uuid, timeout: Duration) -> Result<(), ClientError> {
        let result = self.wait_pipeline(pipeline_id, timeout);
        self.pending_permits
            .lock()
            .expect("permit map lock poisoned")
            .remove(&pipeline_id);
        result
    }

    /// Requests out-of-band cancellation of a running pipeline (§4.D
    /// "cancel").
    pub fn cancel(&self, pipeline_id: Uuid) -> Result<(), ClientError> {
        let mut guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
        pool.cancel_pipeline(pipeline_id)
    }

    /// Reports the session's current health (§4.F): `Healthy` means the
    /// pool is open and the server has advertised at least one available
    /// runspace (or never advertised a count at all); `Degraded` means the
    /// pool is open but the server reported zero; `Unhealthy` means the pool
    /// is disconnected or broken; `Unknown` covers every other state (e.g.
    /// mid-handshake, or no pool at all).
    pub fn health(&self) -> BackendHealth {
        let guard = self.pool.lock().expect("pool lock poisoned");
        let Some(pool) = guard.as_ref() else {
            return BackendHealth::Unknown;
        };
        match pool.state() {
            RunspacePoolState::Opened => match pool.available_runspaces() {
                Some(0) => BackendHealth::Degraded,
                _ => BackendHealth::Healthy,
            },
            RunspacePoolState::Disconnected | RunspacePoolState::Broken => BackendHealth::Unhealthy,
            _ => BackendHealth::Unknown,
        }
    }

    /// Tears the session down (§4.E "close"). `Graceful` waits for the pool
    /// to report a terminal state before closing the backend; `Force` tears
    /// the backend down immediately.
    pub fn close(&self, strategy: CloseStrategy) -> Result<(), ClientError> {
        {
            let mut guard = self.pool.lock().expect("pool lock poisoned");
            if let Some(pool) = guard.as_mut() {
                match strategy {
                    CloseStrategy::Graceful => pool.close(self.config.timeout)?,
                    CloseStrategy::Force => {
                        let _ = pool.close(Duration::from_secs(0));
                    }
                }
            }
            *guard = None;
        }

        if let Some(mut loop_) = self
            .dispatch_loop
            .lock()
            .expect("dispatch loop lock poisoned")
            .take()
        {
            loop_.stop();
        }
        if let Some(mut ticker) = self.keepalive.lock().expect("keepalive lock poisoned").take() {
            ticker.stop();
            ticker.wait_complete();
        }
        if let Some(mut monitor) = self
            .reconnect_monitor
            .lock()
            .expect("reconnect monitor lock poisoned")
            .take()
        {
            monitor.stop();
        }

        self.security_logger.emit(
            SecurityEvent::new(SecurityEventType::SessionLifecycle, "close", Outcome::Success)
                .target(&self.target),
        );
        Ok(())
    }

    /// Snapshots enough state to later reattach to a still-live server-side
    /// pool; never includes credentials (§4.H).
    pub fn save_state(&self) -> Result<PersistedSessionState, ClientError> {
        let guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_ref().ok_or(ClientError::NotConnected)?;
        Ok(PersistedSessionState {
            pool_id: pool.id,
            message_id: self.message_id(),
            target: self.target.clone(),
            transport: self.config.transport,
            shell_id: pool.shell_id().map(str::to_string),
        })
    }
}

/// Lets [`crate::file_transfer::FileTransferEngine`] drive chunked upload
/// and download scripts through a one-shot pipeline (§4.E, §4.G).
impl ScriptExecutor for Session {
    fn execute(&self, script: &str, timeout: Duration) -> Result<String, ClientError> {
        let _permit = self.gate.acquire(timeout)?;
        self.ensure_connected()?;

        let (pipeline_id, channels) = self.spawn_pipeline(script)?;
        match self.wait_pipeline(pipeline_id, timeout) {
            Ok(()) => {}
            Err(ClientError::PipelineFailed(_)) => {}
            Err(other) => return Err(other),
        }

        let mut out = String::new();
        while let Ok(item) = channels.output.try_recv() {
            match item.format_as_displyable_string() {
                Ok(s) => out.push_str(&s),
                Err(_) => out.push_str(&format!("{:?}", item.data)),
            }
        }
        Ok(out)
    }
}

/// Lets [`crate::file_transfer::FileTransferEngine::upload_streamed`] drive
/// one long-lived pipeline fed over its input stream (§4.D, §4.G).
impl StreamingExecutor for Session {
    fn start_stream(&self, script: &str, timeout: Duration) -> Result<StreamHandle, ClientError> {
        let permit = self.gate.acquire(timeout)?;
        self.ensure_connected()?;
        let pipeline_id = self.spawn_streaming_pipeline(script)?;
        self.pending_permits
            .lock()
            .expect("permit map lock poisoned")
            .insert(pipeline_id, permit);
        Ok(StreamHandle(pipeline_id))
    }

    fn write_chunk(&self, handle: StreamHandle, data: &[u8]) -> Result<(), ClientError> {
        let mut guard = self.pool.lock().expect("pool lock poisoned");
        let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
        pool.write_pipeline_input(
            handle.0,
            PsValue::Primitive(PsPrimitiveValue::Bytes(data.to_vec())),
        )
    }

    fn finish_stream(&self, handle: StreamHandle, timeout: Duration) -> Result<(), ClientError> {
        {
            let mut guard = self.pool.lock().expect("pool lock poisoned");
            let pool = guard.as_mut().ok_or(ClientError::NotConnected)?;
            pool.close_input(handle.0)?;
        }
        let result = self.wait_pipeline(handle.0, timeout);
        self.pending_permits
            .lock()
            .expect("permit map lock poisoned")
            .remove(&handle.0);
        result
    }
}
