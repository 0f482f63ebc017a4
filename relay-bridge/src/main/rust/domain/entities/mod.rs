mod connection_events;
mod connection_lifecycle;

pub use connection_events::{ConnectionEvents, EstablishedHandler, FailureHandler, TextHandler};
pub use connection_lifecycle::{ConnectionLifecycle, StateTransition};
