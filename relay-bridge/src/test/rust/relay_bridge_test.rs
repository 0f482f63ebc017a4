use relay_bridge::{
    ChatBackend, Connection, ConnectionConfig, ConnectionState, ConsoleBackend, MemoryBackend,
    MetricsReporter, PeerOptions, ReconnectPolicy, RelayHub, RestartScheduler, RestartTask,
    TokioRestartScheduler,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct ManualScheduler {
    pending: Mutex<Vec<(Duration, RestartTask)>>,
    history: Mutex<Vec<Duration>>,
}

impl ManualScheduler {
    fn pending_delays(&self) -> Vec<Duration> {
        self.pending.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    fn history(&self) -> Vec<Duration> {
        self.history.lock().unwrap().clone()
    }

    fn fire_all(&self) {
        let tasks: Vec<_> = self.pending.lock().unwrap().drain(..).collect();
        for (_, task) in tasks {
            task();
        }
    }
}

impl RestartScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: RestartTask) {
        self.history.lock().unwrap().push(delay);
        self.pending.lock().unwrap().push((delay, task));
    }
}

struct NullMetrics;

impl MetricsReporter for NullMetrics {
    fn report_state_change(&self, _connection: &str, _state: &ConnectionState) {}
    fn report_reconnect_scheduled(&self, _connection: &str, _delay: Duration) {}
    fn report_message_relayed(&self, _origin: &str) {}
    fn report_send_dropped(&self, _connection: &str) {}
}

fn connection(name: &str, backend: &Arc<MemoryBackend>) -> Arc<Connection> {
    Connection::new(
        ConnectionConfig::new(name, 3).unwrap(),
        Arc::clone(backend) as Arc<dyn ChatBackend>,
    )
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

struct Bridge {
    hub: RelayHub,
    scheduler: Arc<ManualScheduler>,
    a: Arc<MemoryBackend>,
    b: Arc<MemoryBackend>,
    c: Arc<MemoryBackend>,
}

fn three_way_bridge(scheduler: Arc<ManualScheduler>) -> Bridge {
    let policy = ReconnectPolicy::new(Duration::from_secs(5), Duration::from_secs(15)).unwrap();
    let a = Arc::new(MemoryBackend::new());
    let b = Arc::new(MemoryBackend::new());
    let c = Arc::new(MemoryBackend::new());

    let hub = RelayHub::builder(
        Arc::clone(&scheduler) as Arc<dyn RestartScheduler>,
        Arc::new(NullMetrics),
    )
    .connection(connection("a", &a), PeerOptions::network(policy))
    .connection(connection("b", &b), PeerOptions::network(policy))
    .connection(connection("c", &c), PeerOptions::network(policy))
    .build();

    Bridge {
        hub,
        scheduler,
        a,
        b,
        c,
    }
}

#[test]
fn test_text_from_a_reaches_b_and_c_but_not_a() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.hub.start();

    bridge.a.push_text("alice", "hello");

    let expected = "a: alice: hello".to_string();
    assert!(wait_until(|| bridge.b.sent().contains(&expected)
        && bridge.c.sent().contains(&expected)));
    assert!(!bridge.a.sent().iter().any(|line| line.contains("hello")));
    bridge.hub.shutdown();
}

#[test]
fn test_disconnect_of_b_is_reported_and_restarted() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.hub.start();
    let b = Arc::clone(bridge.hub.connection("b").unwrap());

    bridge.b.push_disconnect();

    assert!(wait_until(|| bridge.scheduler.pending_delays().len() == 1));
    assert!(!b.is_established());
    let notice = "connection to b lost. reconnect in 5 seconds.".to_string();
    assert!(bridge.a.sent().contains(&notice));
    assert!(bridge.c.sent().contains(&notice));
    assert_eq!(bridge.scheduler.pending_delays(), vec![Duration::from_secs(5)]);

    bridge.scheduler.fire_all();

    assert!(b.is_established());
    assert_eq!(bridge.b.open_count(), 2);
    assert!(bridge
        .a
        .sent()
        .contains(&"connection to b established.".to_string()));
    bridge.hub.shutdown();
}

#[test]
fn test_repeated_open_failures_use_fixed_delay() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.c.fail_next_opens(2);
    bridge.hub.start();

    bridge.scheduler.fire_all();
    bridge.scheduler.fire_all();

    assert_eq!(
        bridge.scheduler.history(),
        vec![Duration::from_secs(15), Duration::from_secs(15)]
    );
    assert_eq!(bridge.c.open_count(), 3);
    assert!(bridge.hub.connection("c").unwrap().is_established());
    bridge.hub.shutdown();
}

#[test]
fn test_other_connections_keep_relaying_while_one_is_down() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.b.fail_next_opens(1);
    bridge.hub.start();

    bridge.a.push_text("alice", "still here");

    assert!(wait_until(|| bridge
        .c
        .sent()
        .contains(&"a: alice: still here".to_string())));
    assert!(!bridge
        .b
        .sent()
        .iter()
        .any(|line| line.contains("still here")));
    bridge.hub.shutdown();
}

#[test]
fn test_shutdown_phrase_stops_only_that_backend() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.hub.start();

    bridge.b.push_text("bob", "gtfo");

    let b = Arc::clone(bridge.hub.connection("b").unwrap());
    assert!(wait_until(|| b.state() == ConnectionState::Idle));
    assert!(bridge.a.sent().contains(&"b: bob: gtfo".to_string()));
    assert!(bridge.hub.connection("a").unwrap().is_established());
    assert!(bridge.scheduler.pending_delays().is_empty());
    bridge.hub.shutdown();
}

#[test]
fn test_shutdown_stops_every_connection() {
    let bridge = three_way_bridge(Arc::new(ManualScheduler::default()));
    bridge.hub.start();

    bridge.hub.shutdown();

    assert!(bridge
        .hub
        .connections()
        .all(|connection| connection.state() == ConnectionState::Idle));
    assert!(!bridge.a.is_open());
    assert!(!bridge.b.is_open());
    assert!(!bridge.c.is_open());
}

#[test]
fn test_console_lines_are_relayed_with_console_prefix() {
    let network = Arc::new(MemoryBackend::new());
    let console_backend: Arc<dyn ChatBackend> = Arc::new(ConsoleBackend::new(
        "console",
        Cursor::new("hi there\n\nbye\n"),
        Vec::new(),
    ));
    let console = Connection::new(ConnectionConfig::new("console", 3).unwrap(), console_backend);

    let hub = RelayHub::builder(Arc::new(ManualScheduler::default()), Arc::new(NullMetrics))
        .connection(
            connection("irc", &network),
            PeerOptions::network(ReconnectPolicy::default()),
        )
        .console(console)
        .build();

    hub.start();
    hub.run_console();

    let sent = network.sent();
    assert!(sent.contains(&"console: hi there".to_string()));
    assert!(sent.contains(&"console: bye".to_string()));
    assert!(sent.contains(&"connection to console lost.".to_string()));
    assert!(!sent.contains(&"console: ".to_string()));
    hub.shutdown();
}

#[test]
fn test_farewell_is_announced_from_console() {
    let network = Arc::new(MemoryBackend::new());
    let console_backend: Arc<dyn ChatBackend> =
        Arc::new(ConsoleBackend::new("console", Cursor::new(""), Vec::new()));
    let console = Connection::new(ConnectionConfig::new("console", 3).unwrap(), console_backend);

    let hub = RelayHub::builder(Arc::new(ManualScheduler::default()), Arc::new(NullMetrics))
        .connection(
            connection("irc", &network),
            PeerOptions::network(ReconnectPolicy::default()),
        )
        .console(console)
        .build();

    hub.start();
    hub.announce_from_console("Goodbye.");

    assert!(network.sent().contains(&"console: Goodbye.".to_string()));
    hub.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_scheduler_restarts_after_delay() {
    let policy =
        ReconnectPolicy::new(Duration::from_millis(100), Duration::from_millis(100)).unwrap();
    let a = Arc::new(MemoryBackend::new());
    let b = Arc::new(MemoryBackend::new());
    a.fail_next_opens(1);

    let hub = Arc::new(
        RelayHub::builder(
            Arc::new(TokioRestartScheduler::current()),
            Arc::new(NullMetrics),
        )
        .connection(connection("a", &a), PeerOptions::network(policy))
        .connection(connection("b", &b), PeerOptions::network(policy))
        .build(),
    );

    let started = Instant::now();
    let starter = Arc::clone(&hub);
    tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap();
    assert!(!hub.connection("a").unwrap().is_established());

    let deadline = Instant::now() + Duration::from_secs(3);
    while !hub.connection("a").unwrap().is_established() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(hub.connection("a").unwrap().is_established());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(a.open_count(), 2);

    let stopper = Arc::clone(&hub);
    tokio::task::spawn_blocking(move || stopper.shutdown())
        .await
        .unwrap();
}
