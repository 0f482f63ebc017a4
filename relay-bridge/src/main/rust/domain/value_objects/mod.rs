mod connection_config;
mod connection_state;
mod endpoint_config;
mod reconnect_policy;
mod relay_line;
mod relay_settings;
mod send_outcome;

pub use connection_config::ConnectionConfig;
pub use connection_state::ConnectionState;
pub use endpoint_config::EndpointConfig;
pub use reconnect_policy::{ReconnectPolicy, RestartCause};
pub use relay_line::RelayLine;
pub use relay_settings::RelaySettings;
pub use send_outcome::SendOutcome;
