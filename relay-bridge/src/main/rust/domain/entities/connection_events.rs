use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::errors::DomainError;

/// Receives `(sender, message)` for every inbound text event
pub type TextHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Runs after a connection completed open and handshake
pub type EstablishedHandler = Arc<dyn Fn() + Send + Sync>;
/// Runs after a lost session or a failed start, with the cause
pub type FailureHandler = Arc<dyn Fn(&DomainError) + Send + Sync>;

/// Publish/subscribe registry with one typed handler list per event kind.
///
/// Handlers fire in registration order. Each `fire_*` call works on a snapshot,
/// so a handler may register further handlers without deadlocking.
#[derive(Default)]
pub struct ConnectionEvents {
    text: RwLock<Vec<TextHandler>>,
    established: RwLock<Vec<EstablishedHandler>>,
    lost: RwLock<Vec<FailureHandler>>,
    failed: RwLock<Vec<FailureHandler>>,
}

impl ConnectionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_text<F>(&self, handler: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        push(&self.text, Arc::new(handler));
    }

    pub fn subscribe_established<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        push(&self.established, Arc::new(handler));
    }

    pub fn subscribe_lost<F>(&self, handler: F)
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        push(&self.lost, Arc::new(handler));
    }

    pub fn subscribe_failed<F>(&self, handler: F)
    where
        F: Fn(&DomainError) + Send + Sync + 'static,
    {
        push(&self.failed, Arc::new(handler));
    }

    pub fn fire_text(&self, sender: &str, message: &str) {
        for handler in snapshot(&self.text) {
            handler(sender, message);
        }
    }

    pub fn fire_established(&self) {
        for handler in snapshot(&self.established) {
            handler();
        }
    }

    pub fn fire_lost(&self, cause: &DomainError) {
        for handler in snapshot(&self.lost) {
            handler(cause);
        }
    }

    pub fn fire_failed(&self, cause: &DomainError) {
        for handler in snapshot(&self.failed) {
            handler(cause);
        }
    }
}

impl fmt::Debug for ConnectionEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEvents")
            .field("text", &snapshot(&self.text).len())
            .field("established", &snapshot(&self.established).len())
            .field("lost", &snapshot(&self.lost).len())
            .field("failed", &snapshot(&self.failed).len())
            .finish()
    }
}

fn push<T>(list: &RwLock<Vec<T>>, handler: T) {
    list.write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(handler);
}

fn snapshot<T: Clone>(list: &RwLock<Vec<T>>) -> Vec<T> {
    list.read().unwrap_or_else(PoisonError::into_inner).clone()
}
