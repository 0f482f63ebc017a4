use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::Level;

use crate::domain::entities::{ConnectionEvents, ConnectionLifecycle, StateTransition};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ChatBackend, InboundText};
use crate::domain::value_objects::{ConnectionConfig, ConnectionState, SendOutcome};

/// Emit a tracing event if the connection's own verbosity allows it
macro_rules! conn_event {
    ($conn:expr, $level:ident, $($arg:tt)+) => {
        if $conn.log_enabled(Level::$level) {
            tracing::event!(Level::$level, connection = %$conn.name(), $($arg)+);
        }
    };
}

#[derive(Debug, Default)]
struct Session {
    lifecycle: ConnectionLifecycle,
    /// Bumped on every start, stop and loss; a listen loop only acts for its own generation
    generation: u64,
    stop_requested: bool,
}

/// Drives one backend through open → initialize → listen → teardown and
/// publishes the resulting text and lifecycle events.
pub struct Connection {
    config: ConnectionConfig,
    backend: Arc<dyn ChatBackend>,
    events: ConnectionEvents,
    session: Mutex<Session>,
    /// Held across open + initialize; a superseded attempt closes only its own transport
    establishing: Mutex<()>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    pub fn new(config: ConnectionConfig, backend: Arc<dyn ChatBackend>) -> Arc<Self> {
        Arc::new(Self {
            config,
            backend,
            events: ConnectionEvents::new(),
            session: Mutex::new(Session::default()),
            establishing: Mutex::new(()),
            listener: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        self.config.name()
    }

    pub fn state(&self) -> ConnectionState {
        *self.session().lifecycle.current_state()
    }

    pub fn is_established(&self) -> bool {
        self.session().lifecycle.is_established()
    }

    /// True after `stop()` until the next `start()`/`run()`
    pub fn is_stop_requested(&self) -> bool {
        self.session().stop_requested
    }

    /// Time since the current session was established
    pub fn uptime(&self) -> Option<Duration> {
        self.session().lifecycle.uptime()
    }

    pub fn transition_count(&self) -> usize {
        self.session().lifecycle.transition_count()
    }

    pub fn last_transition(&self) -> Option<StateTransition> {
        self.session().lifecycle.last_transition().cloned()
    }

    pub fn register_text_callback<F>(&self, handler: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.events.subscribe_text(handler);
    }

    pub fn register_connection_established_callback<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events.subscribe_established(handler);
    }

    pub fn register_connection_lost_callback<F>(&self, handler: F)
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        self.events.subscribe_lost(handler);
    }

    pub fn register_connection_failed_callback<F>(&self, handler: F)
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        self.events.subscribe_failed(handler);
    }

    /// Open and initialize the backend, then listen on a dedicated thread.
    ///
    /// A no-op unless the connection is idle. Failures never propagate: they
    /// surface as `connection failed` events.
    pub fn start(self: &Arc<Self>) {
        self.spawn_session(false);
    }

    /// `start()` for automatic reconnects: does nothing once `stop()` was requested
    pub fn restart(self: &Arc<Self>) {
        self.spawn_session(true);
    }

    fn spawn_session(self: &Arc<Self>, unless_stopped: bool) {
        let Some(generation) = self.establish(unless_stopped) else {
            return;
        };

        let conn = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("listen-{}", self.name()))
            .spawn(move || conn.listen(generation));

        match spawned {
            Ok(handle) => *lock(&self.listener) = Some(handle),
            Err(e) => self.declare_lost(
                generation,
                DomainError::TransportLost(format!("cannot spawn listener: {}", e)),
            ),
        }
    }

    /// Like `start()`, but listens on the calling thread until the session ends.
    pub fn run(&self) {
        if let Some(generation) = self.establish(false) {
            self.listen(generation);
        }
    }

    /// Tear the session down without firing lost/failed events. Safe in any state.
    ///
    /// When called from another thread, returns only after the listen loop exited.
    pub fn stop(&self) {
        let previous = {
            let mut session = self.session();
            session.stop_requested = true;
            session.generation += 1;
            let previous = *session.lifecycle.current_state();
            if previous.is_active() {
                session.lifecycle.transition_to_closing();
            }
            previous
        };

        self.backend.close();
        self.reap_listener();

        {
            let mut session = self.session();
            if *session.lifecycle.current_state() == ConnectionState::Closing {
                session
                    .lifecycle
                    .transition_to_idle(Some("stopped".to_string()));
            }
        }

        conn_event!(self, INFO, "connection stopped (was {})", previous);
    }

    /// Send a chat message; dropped silently while not established
    pub fn send_text_message(&self, message: &str) -> SendOutcome {
        self.deliver(|backend| backend.send_text(message))
    }

    /// Send a raw protocol line; dropped silently while not established
    pub fn send_message(&self, message: &str) -> SendOutcome {
        self.deliver(|backend| backend.send_raw(message))
    }

    /// Update presence/status text on the backend; `None` clears it
    pub fn set_status_text(&self, text: Option<&str>) -> SendOutcome {
        self.deliver(|backend| backend.set_status_text(text))
    }

    pub fn transform_inbound(&self, text: &str) -> String {
        self.backend.transform_inbound(text)
    }

    fn log_enabled(&self, level: Level) -> bool {
        self.config.log_filter() >= level
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.session)
    }

    /// Run open + initialize for a new generation. Returns the generation on success.
    fn establish(&self, unless_stopped: bool) -> Option<u64> {
        let generation = {
            let mut session = self.session();
            if unless_stopped && session.stop_requested {
                drop(session);
                conn_event!(self, INFO, "restart skipped: connection was stopped");
                return None;
            }
            let state = *session.lifecycle.current_state();
            if state.is_active() {
                drop(session);
                conn_event!(self, DEBUG, "start ignored while {}", state);
                return None;
            }
            session.generation += 1;
            session.stop_requested = false;
            session.lifecycle.transition_to_opening();
            session.generation
        };

        // the previous listen loop must be gone before the transport is reused
        self.reap_listener();

        match self.open_and_initialize(generation) {
            Ok(true) => {
                conn_event!(self, INFO, "connection established");
                self.events.fire_established();
                Some(generation)
            }
            Ok(false) => None,
            Err(e) => self.abort_start(generation, e),
        }
    }

    /// Returns `Ok(false)` when a stop or newer start superseded `generation`.
    /// Every failure path closes the transport before the lock is released.
    fn open_and_initialize(&self, generation: u64) -> Result<bool> {
        let _establishing = lock(&self.establishing);
        if !self.is_generation(generation) {
            return Ok(false);
        }

        conn_event!(self, INFO, "opening connection");
        if let Err(e) = self.backend.open() {
            self.backend.close();
            return Err(e);
        }

        if !self.advance(generation, ConnectionState::Initializing) {
            self.backend.close();
            return Ok(false);
        }

        conn_event!(self, DEBUG, "initializing connection");
        if let Err(e) = self.backend.initialize() {
            self.backend.close();
            return Err(e);
        }

        if !self.advance(generation, ConnectionState::Connected) {
            self.backend.close();
            return Ok(false);
        }
        Ok(true)
    }

    fn is_generation(&self, generation: u64) -> bool {
        self.session().generation == generation
    }

    /// Move to `next` if no stop or restart superseded `generation`
    fn advance(&self, generation: u64, next: ConnectionState) -> bool {
        let mut session = self.session();
        if session.generation != generation {
            return false;
        }
        match next {
            ConnectionState::Initializing => session.lifecycle.transition_to_initializing(),
            ConnectionState::Connected => session.lifecycle.transition_to_connected(),
            ConnectionState::Opening => session.lifecycle.transition_to_opening(),
            ConnectionState::Closing => session.lifecycle.transition_to_closing(),
            ConnectionState::Idle => session.lifecycle.transition_to_idle(None),
        }
        true
    }

    fn abort_start(&self, generation: u64, cause: DomainError) -> Option<u64> {
        {
            let mut session = self.session();
            if session.generation != generation {
                return None;
            }
            session.lifecycle.transition_to_idle(Some(cause.to_string()));
        }

        conn_event!(self, WARN, "connection failed: {}", cause);
        self.events.fire_failed(&cause);
        None
    }

    fn listen(&self, generation: u64) {
        conn_event!(self, DEBUG, "listen loop started");

        while self.is_current(generation) {
            match self.backend.receive() {
                Ok(Some(InboundText { sender, message })) => {
                    if !self.is_current(generation) {
                        break;
                    }
                    conn_event!(self, TRACE, sender = %sender, "inbound text: {}", message);
                    self.events.fire_text(&sender, &message);
                }
                Ok(None) => {}
                Err(e) => {
                    self.declare_lost(generation, e);
                    break;
                }
            }
        }

        conn_event!(self, DEBUG, "listen loop exited");
    }

    fn is_current(&self, generation: u64) -> bool {
        let session = self.session();
        session.generation == generation && session.lifecycle.is_established()
    }

    /// Transition an established session to idle and fire `connection lost` exactly once
    fn declare_lost(&self, generation: u64, cause: DomainError) {
        {
            let mut session = self.session();
            if session.generation != generation || !session.lifecycle.is_established() {
                return;
            }
            session.generation += 1;
            session.lifecycle.transition_to_idle(Some(cause.to_string()));
        }

        self.backend.close();
        conn_event!(self, WARN, "connection lost: {}", cause);
        self.events.fire_lost(&cause);
    }

    fn deliver(&self, write: impl FnOnce(&dyn ChatBackend) -> Result<()>) -> SendOutcome {
        let generation = {
            let session = self.session();
            if !session.lifecycle.is_established() {
                drop(session);
                conn_event!(self, DEBUG, "{}", DomainError::SendDropped(self.name().to_string()));
                return SendOutcome::Dropped;
            }
            session.generation
        };

        match write(self.backend.as_ref()) {
            Ok(()) => SendOutcome::Sent,
            Err(e) => {
                self.declare_lost(generation, e);
                SendOutcome::Failed
            }
        }
    }

    /// Join the previous listen thread, unless we are running on it
    fn reap_listener(&self) {
        let handle = lock(&self.listener).take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                conn_event!(self, ERROR, "listen thread panicked");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
