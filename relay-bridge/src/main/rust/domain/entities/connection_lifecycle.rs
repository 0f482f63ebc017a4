use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::domain::value_objects::ConnectionState;

/// Number of transitions retained for inspection; older entries are discarded
const HISTORY_LIMIT: usize = 64;

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Domain entity representing one connection's lifecycle
#[derive(Debug)]
pub struct ConnectionLifecycle {
    current_state: ConnectionState,
    state_history: VecDeque<StateTransition>,
    transition_count: usize,
    connected_at: Option<Instant>,
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        Self {
            current_state: ConnectionState::Idle,
            state_history: VecDeque::new(),
            transition_count: 0,
            connected_at: None,
        }
    }

    pub fn current_state(&self) -> &ConnectionState {
        &self.current_state
    }

    pub fn is_established(&self) -> bool {
        self.current_state.is_established()
    }

    /// Time spent in the current session, if connected
    pub fn uptime(&self) -> Option<Duration> {
        self.connected_at.map(|start| start.elapsed())
    }

    pub fn transition_count(&self) -> usize {
        self.transition_count
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.state_history.back()
    }

    pub fn transition_to_opening(&mut self) {
        self.record_transition(ConnectionState::Opening, None);
    }

    pub fn transition_to_initializing(&mut self) {
        self.record_transition(ConnectionState::Initializing, None);
    }

    pub fn transition_to_connected(&mut self) {
        self.record_transition(ConnectionState::Connected, None);
        self.connected_at = Some(Instant::now());
    }

    pub fn transition_to_closing(&mut self) {
        self.record_transition(ConnectionState::Closing, None);
    }

    pub fn transition_to_idle(&mut self, reason: Option<String>) {
        self.record_transition(ConnectionState::Idle, reason);
    }

    fn record_transition(&mut self, new_state: ConnectionState, reason: Option<String>) {
        if !new_state.is_established() {
            self.connected_at = None;
        }

        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            timestamp: Instant::now(),
            reason,
        };

        if self.state_history.len() == HISTORY_LIMIT {
            self.state_history.pop_front();
        }
        self.state_history.push_back(transition);
        self.transition_count += 1;
        self.current_state = new_state;
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let lifecycle = ConnectionLifecycle::new();
        assert_eq!(*lifecycle.current_state(), ConnectionState::Idle);
        assert_eq!(lifecycle.transition_count(), 0);
        assert!(!lifecycle.is_established());
    }

    #[test]
    fn test_transitions_are_tracked() {
        let mut lifecycle = ConnectionLifecycle::new();

        lifecycle.transition_to_opening();
        lifecycle.transition_to_initializing();
        lifecycle.transition_to_connected();

        assert_eq!(lifecycle.transition_count(), 3);
        assert_eq!(*lifecycle.current_state(), ConnectionState::Connected);
        assert!(lifecycle.is_established());
    }

    #[test]
    fn test_uptime_only_while_connected() {
        let mut lifecycle = ConnectionLifecycle::new();
        assert!(lifecycle.uptime().is_none());

        lifecycle.transition_to_connected();
        std::thread::sleep(Duration::from_millis(10));
        assert!(lifecycle.uptime().unwrap().as_millis() >= 10);

        lifecycle.transition_to_idle(Some("peer hung up".to_string()));
        assert!(lifecycle.uptime().is_none());
    }

    #[test]
    fn test_last_transition_keeps_reason() {
        let mut lifecycle = ConnectionLifecycle::new();
        lifecycle.transition_to_opening();
        lifecycle.transition_to_idle(Some("refused".to_string()));

        let last = lifecycle.last_transition().unwrap();
        assert_eq!(last.from, ConnectionState::Opening);
        assert_eq!(last.to, ConnectionState::Idle);
        assert_eq!(last.reason.as_deref(), Some("refused"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut lifecycle = ConnectionLifecycle::new();
        for _ in 0..HISTORY_LIMIT {
            lifecycle.transition_to_opening();
            lifecycle.transition_to_idle(None);
        }

        assert_eq!(lifecycle.transition_count(), HISTORY_LIMIT * 2);
        assert_eq!(lifecycle.state_history.len(), HISTORY_LIMIT);
    }
}
