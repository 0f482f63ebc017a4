use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ChatBackend, InboundText};

#[derive(Debug)]
enum Scripted {
    Text(InboundText),
    Disconnect,
}

#[derive(Debug, Default)]
struct MemoryState {
    open: bool,
    inbound: VecDeque<Scripted>,
    sent: Vec<String>,
    statuses: Vec<Option<String>>,
    open_count: u32,
    write_attempts: u32,
    failing_opens: u32,
    failing_inits: u32,
    fail_writes: bool,
    hold_next_open: bool,
    open_held: bool,
}

/// In-process backend with scripted inbound traffic and scripted failures.
///
/// Inbound events queued before an open are delivered once the session is up.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    arrivals: Condvar,
    gate: Condvar,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, sender: &str, message: &str) {
        self.push(Scripted::Text(InboundText::new(sender, message)));
    }

    /// Make the next `receive` report a dropped transport
    pub fn push_disconnect(&self) {
        self.push(Scripted::Disconnect);
    }

    pub fn fail_next_opens(&self, count: u32) {
        self.state().failing_opens = count;
    }

    pub fn fail_next_inits(&self, count: u32) {
        self.state().failing_inits = count;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Park the next `open` until `release_open` is called
    pub fn hold_next_open(&self) {
        self.state().hold_next_open = true;
    }

    pub fn release_open(&self) {
        self.state().open_held = false;
        self.gate.notify_all();
    }

    /// True while an `open` is parked by `hold_next_open`
    pub fn is_open_held(&self) -> bool {
        self.state().open_held
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn open_count(&self) -> u32 {
        self.state().open_count
    }

    pub fn write_attempts(&self) -> u32 {
        self.state().write_attempts
    }

    /// Every line written so far, chat messages and raw lines alike
    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    pub fn statuses(&self) -> Vec<Option<String>> {
        self.state().statuses.clone()
    }

    fn push(&self, item: Scripted) {
        self.state().inbound.push_back(item);
        self.arrivals.notify_all();
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, record: impl FnOnce(&mut MemoryState)) -> Result<()> {
        let mut state = self.state();
        state.write_attempts += 1;
        if !state.open {
            return Err(DomainError::TransportLost("memory backend is closed".to_string()));
        }
        if state.fail_writes {
            return Err(DomainError::TransportLost("scripted write failure".to_string()));
        }
        record(&mut state);
        Ok(())
    }
}

impl ChatBackend for MemoryBackend {
    fn open(&self) -> Result<()> {
        let mut state = self.state();
        state.open_count += 1;
        if std::mem::take(&mut state.hold_next_open) {
            state.open_held = true;
            while state.open_held {
                state = self.gate.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        }
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(DomainError::OpenFailure("scripted open failure".to_string()));
        }
        state.open = true;
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        let mut state = self.state();
        if state.failing_inits > 0 {
            state.failing_inits -= 1;
            return Err(DomainError::InitFailure("scripted handshake rejection".to_string()));
        }
        Ok(())
    }

    fn close(&self) {
        self.state().open = false;
        self.arrivals.notify_all();
    }

    fn receive(&self) -> Result<Option<InboundText>> {
        let mut state = self.state();
        loop {
            if !state.open {
                return Err(DomainError::TransportLost("memory backend is closed".to_string()));
            }
            match state.inbound.pop_front() {
                Some(Scripted::Text(text)) => return Ok(Some(text)),
                Some(Scripted::Disconnect) => {
                    state.open = false;
                    return Err(DomainError::TransportLost("scripted disconnect".to_string()));
                }
                None => {
                    state = self
                        .arrivals
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn send_raw(&self, line: &str) -> Result<()> {
        self.write(|state| state.sent.push(line.to_string()))
    }

    fn set_status_text(&self, text: Option<&str>) -> Result<()> {
        self.write(|state| state.statuses.push(text.map(str::to_string)))
    }
}
