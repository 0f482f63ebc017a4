use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::Connection;
use crate::domain::errors::DomainError;
use crate::domain::ports::{MetricsReporter, RestartScheduler};
use crate::domain::value_objects::{
    ConnectionState, ReconnectPolicy, RelayLine, RelaySettings, RestartCause, SendOutcome,
};

/// How the hub treats one member connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerOptions {
    /// `None` means the connection is announced when it drops but never restarted
    pub reconnect: Option<ReconnectPolicy>,
    /// Whether the shutdown phrase received on this connection stops it
    pub honors_shutdown_phrase: bool,
}

impl PeerOptions {
    /// A network backend: restarted per `policy`, obeys the shutdown phrase
    pub fn network(policy: ReconnectPolicy) -> Self {
        Self {
            reconnect: Some(policy),
            honors_shutdown_phrase: true,
        }
    }

    /// The local console: never restarted, never shut down by phrase
    pub fn console() -> Self {
        Self {
            reconnect: None,
            honors_shutdown_phrase: false,
        }
    }
}

struct Peer {
    connection: Arc<Connection>,
    options: PeerOptions,
}

struct HubCore {
    peers: Vec<Peer>,
    console: Option<usize>,
    settings: RelaySettings,
    scheduler: Arc<dyn RestartScheduler>,
    metrics: Arc<dyn MetricsReporter>,
    /// Outage lines of restartable peers that are still down, oldest first
    outages: Mutex<Vec<(usize, String)>>,
}

/// Application service wiring a fixed set of connections into a bridge.
///
/// Text from one connection is relayed to every other one; lifecycle events
/// are mirrored as status lines and drive the fixed-delay restart policy.
pub struct RelayHub {
    core: Arc<HubCore>,
}

/// Collects the member connections before the hub wires them together
pub struct RelayHubBuilder {
    peers: Vec<Peer>,
    console: Option<usize>,
    settings: RelaySettings,
    scheduler: Arc<dyn RestartScheduler>,
    metrics: Arc<dyn MetricsReporter>,
}

impl RelayHubBuilder {
    pub fn settings(mut self, settings: RelaySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn connection(mut self, connection: Arc<Connection>, options: PeerOptions) -> Self {
        self.peers.push(Peer {
            connection,
            options,
        });
        self
    }

    /// Register the console; it is started by `RelayHub::run_console`, not `start`
    pub fn console(mut self, connection: Arc<Connection>) -> Self {
        self.console = Some(self.peers.len());
        self.connection(connection, PeerOptions::console())
    }

    pub fn build(self) -> RelayHub {
        let core = Arc::new(HubCore {
            peers: self.peers,
            console: self.console,
            settings: self.settings,
            scheduler: self.scheduler,
            metrics: self.metrics,
            outages: Mutex::new(Vec::new()),
        });
        HubCore::wire(&core);
        RelayHub { core }
    }
}

impl RelayHub {
    pub fn builder(
        scheduler: Arc<dyn RestartScheduler>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> RelayHubBuilder {
        RelayHubBuilder {
            peers: Vec::new(),
            console: None,
            settings: RelaySettings::default(),
            scheduler,
            metrics,
        }
    }

    pub fn connection(&self, name: &str) -> Option<&Arc<Connection>> {
        self.core
            .peers
            .iter()
            .map(|peer| &peer.connection)
            .find(|connection| connection.name() == name)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Arc<Connection>> {
        self.core.peers.iter().map(|peer| &peer.connection)
    }

    /// Start every non-console connection; each then keeps itself alive via the restart policy
    pub fn start(&self) {
        for (index, peer) in self.core.peers.iter().enumerate() {
            if Some(index) != self.core.console {
                peer.connection.start();
            }
        }
    }

    /// Run the console on the calling thread; returns when console input ends
    pub fn run_console(&self) {
        if let Some(index) = self.core.console {
            self.core.peers[index].connection.run();
        }
    }

    /// Relay a line as if the console had typed it (e.g. a farewell on interrupt)
    pub fn announce_from_console(&self, message: &str) {
        match self.core.console {
            Some(index) => {
                let name = self.core.peers[index].connection.name().to_string();
                self.core.relay_text(index, &name, message);
            }
            None => self.core.broadcast(None, message),
        }
    }

    /// Stop every connection; pending restarts see the stop and do nothing
    pub fn shutdown(&self) {
        for peer in &self.core.peers {
            peer.connection.stop();
            self.core
                .metrics
                .report_state_change(peer.connection.name(), &peer.connection.state());
        }
        tracing::info!("All connections stopped");
    }
}

impl HubCore {
    fn wire(core: &Arc<Self>) {
        for (index, peer) in core.peers.iter().enumerate() {
            let connection = &peer.connection;

            let hub = Arc::downgrade(core);
            connection.register_text_callback(move |sender, message| {
                with_hub(&hub, |core| core.relay_text(index, sender, message));
            });

            let hub = Arc::downgrade(core);
            connection.register_connection_established_callback(move || {
                with_hub(&hub, |core| core.on_established(index));
            });

            let hub = Arc::downgrade(core);
            connection.register_connection_lost_callback(move |cause| {
                with_hub(&hub, |core| core.on_outage(index, RestartCause::Lost, cause));
            });

            let hub = Arc::downgrade(core);
            connection.register_connection_failed_callback(move |cause| {
                with_hub(&hub, |core| core.on_outage(index, RestartCause::Failed, cause));
            });
        }
    }

    fn relay_text(&self, origin: usize, sender: &str, message: &str) {
        let peer = &self.peers[origin];
        let name = peer.connection.name();
        let text = peer.connection.transform_inbound(message);
        if text.trim().is_empty() {
            return;
        }

        let line = RelayLine::chat(name, sender, &text);
        self.broadcast(Some(origin), &line);
        self.metrics.report_message_relayed(name);

        if peer.options.honors_shutdown_phrase && self.settings.is_shutdown_phrase(&text) {
            tracing::info!(connection = %name, sender = %sender, "Shutdown phrase received");
            peer.connection
                .send_text_message(self.settings.shutdown_reply());
            peer.connection.stop();
            self.metrics
                .report_state_change(name, &peer.connection.state());
        }
    }

    fn on_established(&self, index: usize) {
        let name = self.peers[index].connection.name();
        self.metrics
            .report_state_change(name, &ConnectionState::Connected);
        self.broadcast(Some(index), &RelayLine::established(name));

        let outages = {
            let mut outages = self.outages();
            outages.retain(|(down, _)| *down != index);
            outages.clone()
        };

        // peers keep showing the latest outage that is still unresolved
        for (other, peer) in self.peers.iter().enumerate() {
            if !peer.connection.is_established() {
                continue;
            }
            let status = outages
                .iter()
                .rev()
                .find(|(down, _)| *down != other)
                .map(|(_, line)| line.as_str());
            if other != index || status.is_some() {
                peer.connection.set_status_text(status);
            }
        }
    }

    fn on_outage(self: &Arc<Self>, index: usize, cause: RestartCause, error: &DomainError) {
        let peer = &self.peers[index];
        let name = peer.connection.name();
        self.metrics.report_state_change(name, &ConnectionState::Idle);

        let delay = peer.options.reconnect.map(|policy| policy.delay_for(cause));
        let line = RelayLine::outage(name, cause, delay);
        tracing::warn!(connection = %name, "{} ({})", line, error);

        self.broadcast(Some(index), &line);
        for other in self.others(index) {
            other.connection.set_status_text(Some(&line));
        }

        if let Some(delay) = delay {
            {
                let mut outages = self.outages();
                outages.retain(|(down, _)| *down != index);
                outages.push((index, line.clone()));
            }
            self.metrics.report_reconnect_scheduled(name, delay);
            let hub = Arc::downgrade(self);
            self.scheduler.schedule(
                delay,
                Box::new(move || with_hub(&hub, |core| core.restart(index))),
            );
        }
    }

    fn restart(&self, index: usize) {
        let connection = &self.peers[index].connection;
        tracing::info!(connection = %connection.name(), "Restarting connection");
        connection.restart();
    }

    /// Send to every connection except `origin`; down peers drop the line
    fn broadcast(&self, origin: Option<usize>, line: &str) {
        for (index, peer) in self.peers.iter().enumerate() {
            if Some(index) == origin {
                continue;
            }
            if peer.connection.send_text_message(line) == SendOutcome::Dropped {
                self.metrics.report_send_dropped(peer.connection.name());
            }
        }
    }

    fn outages(&self) -> MutexGuard<'_, Vec<(usize, String)>> {
        self.outages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn others(&self, index: usize) -> impl Iterator<Item = &Peer> {
        self.peers
            .iter()
            .enumerate()
            .filter(move |(other, _)| *other != index)
            .map(|(_, peer)| peer)
    }
}

fn with_hub(hub: &Weak<HubCore>, action: impl FnOnce(&Arc<HubCore>)) {
    if let Some(core) = hub.upgrade() {
        action(&core);
    }
}
