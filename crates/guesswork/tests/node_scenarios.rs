//! End-to-end scenarios: real nodes on an in-process broker.
//!
//! Every test runs on paused Tokio time, so the 25 second capture phase
//! takes no wall-clock time. Nodes and a scripted controller run side by
//! side in one `tokio::join!`; the controller presses switches through
//! shared `VirtualSurface` handles and stops the nodes with oneshots.
//! A "peer" is a bare bus client that speaks the protocol by hand.

use std::future::Future;
use std::time::Duration;

use guesswork::prelude::*;
use guesswork::prompts;
use guesswork_transport::Inbound;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep, sleep_until};

const BASE: &str = "test/game/";

type TestNode = Node<MemoryBus, VirtualSurface, VirtualDisplay>;

struct Device {
    node: TestNode,
    surface: VirtualSurface,
    display: VirtualDisplay,
}

fn device(broker: &MemoryBroker, id: &str) -> Device {
    let surface = VirtualSurface::new();
    let display = VirtualDisplay::new();
    let node = NodeBuilder::new()
        .broker("memory")
        .base_topic(BASE)
        .leader_selection(LeaderSelection::FirstSlot)
        .identity(SessionId::new(id))
        .build(broker.client(), surface.clone(), display.clone());
    Device {
        node,
        surface,
        display,
    }
}

fn stop_signal() -> (oneshot::Sender<()>, impl Future<Output = ()>) {
    let (tx, rx) = oneshot::channel::<()>();
    (tx, async move {
        let _ = rx.await;
    })
}

fn sid(s: &str) -> SessionId {
    SessionId::new(s)
}

/// A hand-driven bus client: publishes as `identity`, records everything.
struct Peer {
    bus: MemoryBus,
    codec: MessageCodec<JsonCodec>,
    inbound: Inbound,
}

impl Peer {
    async fn join(broker: &MemoryBroker, id: &str) -> Self {
        let mut bus = broker.client();
        let inbound = bus.connect("memory").await.unwrap();
        let codec = MessageCodec::json(sid(id), BASE);
        bus.subscribe(&codec.subscription(), true).await.unwrap();
        Self {
            bus,
            codec,
            inbound,
        }
    }

    async fn send(&self, message: Message) {
        let (topic, payload) = self.codec.encode(&message).unwrap();
        self.bus.publish(&topic, &payload).await.unwrap();
    }

    async fn send_raw(&self, suffix: &str, payload: &[u8]) {
        self.bus
            .publish(&format!("{BASE}{suffix}"), payload)
            .await
            .unwrap();
    }

    /// Every decodable message received so far.
    fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(msg) = self.inbound.try_recv() {
            if let Ok(Some(env)) = self.codec.decode(&msg.topic, &msg.payload) {
                out.push(env);
            }
        }
        out
    }
}

fn roles_in(log: &[Envelope]) -> Vec<(SessionId, Vec<SessionId>)> {
    log.iter()
        .filter_map(|e| match &e.message {
            Message::Roles { leader, guessers } => Some((leader.clone(), guessers.clone())),
            _ => None,
        })
        .collect()
}

fn guesses_in(log: &[Envelope]) -> Vec<(SessionId, u32)> {
    log.iter()
        .filter_map(|e| match e.message {
            Message::Guess { guess } => Some((e.identity.clone(), guess)),
            _ => None,
        })
        .collect()
}

fn assert_dark(d: &Device) {
    assert_eq!(d.surface.lamps(), [false; COLUMNS]);
    assert_eq!(d.surface.cell_text(), " ".repeat(COLUMNS));
    assert!(d.display.is_clear());
}

// =========================================================================
// Three devices, two rounds
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_three_devices_converge_and_host_leader_restarts_round() {
    let broker = MemoryBroker::new();
    let mut observer = Peer::join(&broker, "observer").await;

    let mut a = device(&broker, "A");
    let mut b = device(&broker, "B");
    let mut c = device(&broker, "C");
    let (stop_a, sig_a) = stop_signal();
    let (stop_b, sig_b) = stop_signal();
    let (stop_c, sig_c) = stop_signal();
    let (sa, sb, sc) = (a.surface.clone(), b.surface.clone(), c.surface.clone());

    let controller = async {
        sleep(Duration::from_millis(500)).await;
        // Discovery has settled by now.
        assert_eq!(sb.cell_text(), "PLAYER 1");
        assert_eq!(sa.cell_text(), "PLAYER 2");
        assert_eq!(sc.cell_text(), "PLAYER 3");

        sleep(Duration::from_millis(500)).await;
        sb.set_button(true);
        sleep(Duration::from_millis(500)).await;
        sb.set_button(false);

        // One tap each: A enters 1, C enters 100.
        sleep(Duration::from_millis(1_500)).await;
        sa.set_switch(0, true);
        sc.set_switch(2, true);
        sleep(Duration::from_millis(200)).await;
        sa.set_switch(0, false);
        sc.set_switch(2, false);

        // Round 1 ends around t = 26 s; round 2 starts right after.
        sleep(Duration::from_secs(27)).await;
        for stop in [stop_a, stop_b, stop_c] {
            let _ = stop.send(());
        }
    };

    let (ra, rb, rc, ()) = tokio::join!(
        async {
            sleep(Duration::from_millis(100)).await;
            a.node.run(sig_a).await
        },
        b.node.run(sig_b),
        async {
            sleep(Duration::from_millis(200)).await;
            c.node.run(sig_c).await
        },
        controller,
    );
    ra.unwrap();
    rb.unwrap();
    rc.unwrap();

    let expected = [sid("B"), sid("A"), sid("C")];
    assert_eq!(b.node.game().role(), DiscoverRole::Host);
    assert_eq!(a.node.game().role(), DiscoverRole::Client);
    assert_eq!(c.node.game().role(), DiscoverRole::Client);
    for d in [&a, &b, &c] {
        assert_eq!(d.node.game().discovery().roster().as_slice(), &expected);
        assert_eq!(d.node.game().round().round_number(), 2);
    }
    assert_eq!(b.node.game().state(), GameState::Leader);
    assert_eq!(a.node.game().state(), GameState::Guesser);

    let log = observer.drain();
    let roles = roles_in(&log);
    assert_eq!(roles.len(), 2);
    for (leader, guessers) in &roles {
        assert_eq!(leader, &sid("B"));
        assert_eq!(guessers, &vec![sid("A"), sid("C")]);
    }
    let mut guesses = guesses_in(&log);
    guesses.sort();
    assert_eq!(guesses, vec![(sid("A"), 1), (sid("C"), 100)]);

    let starts = b
        .display
        .history()
        .iter()
        .filter(|t| t.as_str() == prompts::STARTING)
        .count();
    assert_eq!(starts, 2);
    let history = a.display.history();
    assert!(history.contains(&prompts::guesser_prompt(Some(1))));
    assert!(history.contains(&prompts::GUESSER_WAITING.to_string()));

    for d in [&a, &b, &c] {
        assert_dark(d);
    }
    assert_eq!(broker.client_count().await, 1, "only the observer stays connected");
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_capture_clears_indicators_and_disconnects() {
    let broker = MemoryBroker::new();
    let mut a = device(&broker, "A");
    let mut b = device(&broker, "B");
    let (stop_a, sig_a) = stop_signal();
    let (stop_b, sig_b) = stop_signal();
    let (sa, sb) = (a.surface.clone(), b.surface.clone());
    let (da, db) = (a.display.clone(), b.display.clone());

    let controller = async {
        sleep(Duration::from_millis(500)).await;
        sb.set_button(true);
        sleep(Duration::from_millis(200)).await;
        sb.set_button(false);
        sleep(Duration::from_secs(10)).await;

        // Mid-capture: partial countdown, digits showing, timer on screen.
        let lit = sb.lit_lamps();
        assert!((1..COLUMNS).contains(&lit), "lit lamps = {lit}");
        assert_eq!(sa.cell_text(), "00000000");
        assert!(da.text().unwrap_or_default().contains("You have"));
        assert!(db.text().unwrap_or_default().contains("You have"));

        let _ = stop_a.send(());
        let _ = stop_b.send(());
    };

    let (ra, rb, ()) = tokio::join!(
        async {
            sleep(Duration::from_millis(100)).await;
            a.node.run(sig_a).await
        },
        b.node.run(sig_b),
        controller,
    );
    ra.unwrap();
    rb.unwrap();

    assert_dark(&a);
    assert_dark(&b);
    assert!(a.node.is_shut_down());
    assert!(!a.node.game().round().is_capturing());
    assert_eq!(broker.client_count().await, 0);
}

#[tokio::test]
async fn test_unreachable_broker_fails_and_still_clears_indicators() {
    let surface = VirtualSurface::new();
    let display = VirtualDisplay::new();
    let mut node = NodeBuilder::new()
        .broker("127.0.0.1:1")
        .build(WebSocketBus::new(), surface.clone(), display.clone());

    let result = node.run(std::future::pending()).await;

    assert!(matches!(result, Err(GuessworkError::Transport(_))));
    assert!(node.is_shut_down());
    assert_eq!(surface.lamps(), [false; COLUMNS]);
    assert_eq!(surface.cell_text(), " ".repeat(COLUMNS));
    assert!(display.is_clear());
}

// =========================================================================
// Self-echo and malformed input
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_own_find_echoed_by_broker_is_ignored() {
    let broker = MemoryBroker::new();
    broker.set_ignore_no_local(true);
    let mut a = device(&broker, "A");
    let (stop, sig) = stop_signal();

    let controller = async {
        sleep(Duration::from_secs(1)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(a.node.run(sig), controller);
    r.unwrap();

    assert_eq!(a.node.game().role(), DiscoverRole::Unknown);
    assert_eq!(a.node.game().discovery().roster().len(), 1);
    assert_eq!(a.display.history(), vec![prompts::LOOKING.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_and_foreign_messages_do_not_stop_node() {
    let broker = MemoryBroker::new();
    let peer = Peer::join(&broker, "P").await;
    let mut a = device(&broker, "A");
    let (stop, sig) = stop_signal();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        peer.send_raw("game/guess", b"not json").await;
        peer.send_raw("game/score", b"{}").await;
        peer.send_raw("discover/find", br#"{"identity": 5}"#).await;
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::Find).await;
        sleep(Duration::from_millis(100)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(a.node.run(sig), controller);
    r.unwrap();

    assert_eq!(a.node.game().role(), DiscoverRole::Host);
    assert_eq!(
        a.node.game().discovery().roster().as_slice(),
        &[sid("A"), sid("P")]
    );
}

// =========================================================================
// Button
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_button_alone_reports_no_players() {
    let broker = MemoryBroker::new();
    let mut a = device(&broker, "A");
    let (stop, sig) = stop_signal();
    let sa = a.surface.clone();

    let controller = async {
        sleep(Duration::from_millis(300)).await;
        sa.set_button(true);
        sleep(Duration::from_millis(300)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(a.node.run(sig), controller);
    r.unwrap();

    assert_eq!(
        a.display.history().last().map(String::as_str),
        Some(prompts::NO_PLAYERS)
    );
    assert_eq!(a.node.game().state(), GameState::Discovering);
}

#[tokio::test(start_paused = true)]
async fn test_button_on_client_starts_nothing() {
    let broker = MemoryBroker::new();
    let mut observer = Peer::join(&broker, "observer").await;
    let mut a = device(&broker, "A");
    let mut b = device(&broker, "B");
    let (stop_a, sig_a) = stop_signal();
    let (stop_b, sig_b) = stop_signal();
    let sa = a.surface.clone();

    let controller = async {
        sleep(Duration::from_millis(500)).await;
        sa.set_button(true);
        sleep(Duration::from_millis(500)).await;
        let _ = stop_a.send(());
        let _ = stop_b.send(());
    };
    let (ra, rb, ()) = tokio::join!(
        async {
            sleep(Duration::from_millis(100)).await;
            a.node.run(sig_a).await
        },
        b.node.run(sig_b),
        controller,
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(a.node.game().role(), DiscoverRole::Client);
    assert!(roles_in(&observer.drain()).is_empty());
    assert_eq!(a.node.game().round().round_number(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_held_button_starts_only_one_round() {
    let broker = MemoryBroker::new();
    let mut observer = Peer::join(&broker, "observer").await;
    let peer = Peer::join(&broker, "P").await;
    let mut b = device(&broker, "B");
    let (stop, sig) = stop_signal();
    let sb = b.surface.clone();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::Find).await;
        sleep(Duration::from_millis(100)).await;
        sb.set_button(true);
        // Held across many idle polls and into the round.
        sleep(Duration::from_secs(2)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(b.node.run(sig), controller);
    r.unwrap();

    assert_eq!(roles_in(&observer.drain()).len(), 1);
    assert_eq!(b.node.game().round().round_number(), 1);
}

// =========================================================================
// Leader that is not the host
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_client_leader_asks_host_for_new_round() {
    let broker = MemoryBroker::new();
    let mut host = Peer::join(&broker, "H").await;
    let mut a = device(&broker, "A");
    let (stop, sig) = stop_signal();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        host.send(Message::Ack {
            roster: vec![sid("H"), sid("A")],
        })
        .await;
        sleep(Duration::from_millis(100)).await;
        host.send(Message::Roles {
            leader: sid("A"),
            guessers: vec![sid("H")],
        })
        .await;
        // A guess arriving during the leader's own capture still counts.
        sleep(Duration::from_secs(5)).await;
        host.send(Message::Guess { guess: 42 }).await;
        sleep(Duration::from_millis(100)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(a.node.run(sig), controller);
    r.unwrap();

    assert_eq!(a.node.game().role(), DiscoverRole::Client);
    assert_eq!(a.node.game().round().guesses().get(&sid("H")), Some(42));

    let asked = host
        .drain()
        .into_iter()
        .filter(|e| e.identity == sid("A") && e.message == Message::NewRound)
        .count();
    assert_eq!(asked, 1);
}

#[tokio::test(start_paused = true)]
async fn test_host_starts_round_on_new_round_request() {
    let broker = MemoryBroker::new();
    let mut peer = Peer::join(&broker, "L").await;
    let mut b = device(&broker, "B");
    let (stop, sig) = stop_signal();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::Find).await;
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::NewRound).await;
        sleep(Duration::from_millis(100)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(b.node.run(sig), controller);
    r.unwrap();

    let roles = roles_in(&peer.drain());
    assert_eq!(roles, vec![(sid("B"), vec![sid("L")])]);
    assert_eq!(b.node.game().state(), GameState::Leader);
}

#[tokio::test(start_paused = true)]
async fn test_late_find_after_game_start_is_ignored() {
    let broker = MemoryBroker::new();
    let peer = Peer::join(&broker, "L").await;
    let late = Peer::join(&broker, "Z").await;
    let mut b = device(&broker, "B");
    let (stop, sig) = stop_signal();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::Find).await;
        sleep(Duration::from_millis(100)).await;
        peer.send(Message::NewRound).await;
        sleep(Duration::from_millis(100)).await;
        late.send(Message::Find).await;
        sleep(Duration::from_millis(100)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(b.node.run(sig), controller);
    r.unwrap();

    assert_eq!(b.node.game().discovery().roster().len(), 2);
}

// =========================================================================
// Capture timing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_capture_expiry_runs_before_roles_queued_at_same_instant() {
    let broker = MemoryBroker::new();
    let mut host = Peer::join(&broker, "H").await;
    let mut c = device(&broker, "C");
    let (stop, sig) = stop_signal();
    let sc = c.surface.clone();

    let controller = async {
        sleep(Duration::from_millis(100)).await;
        let roles = Message::Roles {
            leader: sid("H"),
            guessers: vec![sid("C")],
        };
        let started = Instant::now();
        host.send(roles.clone()).await;
        sc.set_switch(1, true);
        sleep(Duration::from_millis(50)).await;
        sc.set_switch(1, false);

        // The expiring tick is due 25.010 s after the round started.
        sleep_until(started + Duration::from_millis(25_010)).await;
        host.send(roles).await;
        sleep(Duration::from_secs(1)).await;
        let _ = stop.send(());
    };
    let (r, ()) = tokio::join!(c.node.run(sig), controller);
    r.unwrap();

    assert_eq!(guesses_in(&host.drain()), vec![(sid("C"), 10)]);
    assert_eq!(c.node.game().round().round_number(), 2);
}
