mod connection;
mod relay_hub;

pub use connection::Connection;
pub use relay_hub::{PeerOptions, RelayHub, RelayHubBuilder};
