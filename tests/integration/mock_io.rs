//! Mock transport + simulated clock for integration tests.
//!
//! Records every port call so tests can assert on the full publish and
//! timer history without a broker.  Timers live in a real [`TimerQueue`]
//! driven by a manual clock; [`Harness::advance`] fires them in deadline
//! order, moving the clock to each deadline before the callback runs.

#![allow(dead_code)]

use tanknode::app::events::AppEvent;
use tanknode::app::ports::{
    ConnectionEvent, EventSink, LastWill, MqttPort, QoS, SessionParams, TimerPort, TimerRole,
};
use tanknode::app::service::TankNode;
use tanknode::config::{NodeConfig, topic};
use tanknode::error::TransportError;
use tanknode::timers::TimerQueue;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum IoCall {
    Connect,
    Subscribe { topic: String, qos: QoS },
    Publish { topic: String, payload: String, qos: QoS, retain: bool },
    Schedule { role: TimerRole, delay_ms: u32 },
    Cancel(TimerRole),
}

/// A publish the mock accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

// ── MockIo ────────────────────────────────────────────────────

pub struct MockIo {
    pub now_ms: u64,
    pub timers: TimerQueue,
    pub calls: Vec<IoCall>,
    pub sent: Vec<Sent>,
    /// Publishes and subscribes succeed only while set.
    pub link_up: bool,
    /// Make the next `connect()` fail synchronously.
    pub refuse_connect: bool,
}

impl MockIo {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            timers: TimerQueue::new(),
            calls: Vec::new(),
            sent: Vec::new(),
            link_up: false,
            refuse_connect: false,
        }
    }

    pub fn connects(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, IoCall::Connect)).count()
    }

    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                IoCall::Subscribe { topic, qos } => Some((topic.clone(), *qos)),
                _ => None,
            })
            .collect()
    }

    /// Payloads accepted on `topic`, in order.
    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.sent
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| s.payload.clone())
            .collect()
    }

    pub fn levels(&self) -> Vec<u8> {
        self.payloads_on("tank/oxygen_level")
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }

    pub fn trends(&self) -> Vec<String> {
        self.payloads_on("tank/fill_state")
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl Default for MockIo {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttPort for MockIo {
    fn connect(&mut self, _session: &SessionParams) -> Result<(), TransportError> {
        self.calls.push(IoCall::Connect);
        if self.refuse_connect {
            self.refuse_connect = false;
            return Err(TransportError::ConnectFailed);
        }
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        self.calls.push(IoCall::Subscribe {
            topic: topic.into(),
            qos,
        });
        if self.link_up {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), TransportError> {
        let payload = String::from_utf8_lossy(payload).into_owned();
        self.calls.push(IoCall::Publish {
            topic: topic.into(),
            payload: payload.clone(),
            qos,
            retain,
        });
        if !self.link_up {
            return Err(TransportError::NotConnected);
        }
        self.sent.push(Sent {
            topic: topic.into(),
            payload,
            qos,
            retain,
        });
        Ok(())
    }
}

impl TimerPort for MockIo {
    fn schedule(&mut self, role: TimerRole, delay_ms: u32) {
        self.calls.push(IoCall::Schedule { role, delay_ms });
        self.timers.schedule(role, delay_ms, self.now_ms);
    }

    fn cancel(&mut self, role: TimerRole) {
        self.calls.push(IoCall::Cancel(role));
        self.timers.cancel(role);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub fn session() -> SessionParams {
    SessionParams {
        client_id: heapless::String::try_from("nxp_fecaefbeadde").unwrap(),
        broker: "127.0.0.1:1883".parse().unwrap(),
        keep_alive_secs: 100,
        last_will: LastWill {
            topic: topic("tank/availability"),
            payload: "OFFLINE",
            qos: QoS::AtLeastOnce,
            retain: true,
        },
    }
}

pub struct Harness {
    pub node: TankNode,
    pub io: MockIo,
    pub sink: RecordingSink,
}

impl Harness {
    /// A node that has been constructed but not started.
    pub fn new() -> Self {
        Self::with_config(NodeConfig::default())
    }

    pub fn with_config(config: NodeConfig) -> Self {
        Self {
            node: TankNode::new(&config, session()),
            io: MockIo::new(),
            sink: RecordingSink::default(),
        }
    }

    /// Started, accepted and announced, with the publish record cleared.
    pub fn connected() -> Self {
        let mut h = Self::new();
        h.node.start(&mut h.io, &mut h.sink);
        h.accept();
        h.advance(0);
        h.io.clear_sent();
        h
    }

    pub fn start(&mut self) {
        self.node.start(&mut self.io, &mut self.sink);
    }

    pub fn accept(&mut self) {
        self.io.link_up = true;
        self.event(ConnectionEvent::Accepted);
    }

    pub fn drop_link(&mut self) {
        self.io.link_up = false;
        self.event(ConnectionEvent::Disconnected);
    }

    pub fn event(&mut self, ev: ConnectionEvent) {
        self.node.on_connection_event(ev, &mut self.io, &mut self.sink);
    }

    /// Topic notification followed by a single final payload chunk.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.node.on_incoming_publish(topic);
        self.node
            .on_incoming_data(payload, true, &mut self.io, &mut self.sink);
    }

    pub fn fill(&mut self, on: bool) {
        self.deliver("tank/oxygen_request", if on { b"ON" } else { b"OFF" });
    }

    pub fn alarm(&mut self, on: bool) {
        self.deliver("tank/alarm", if on { b"ON" } else { b"OFF" });
    }

    /// Move the clock forward by `ms`, firing every timer that falls due.
    pub fn advance(&mut self, ms: u64) {
        let target = self.io.now_ms + ms;
        while let Some(deadline) = self.io.timers.next_deadline() {
            if deadline > target {
                break;
            }
            self.io.now_ms = deadline;
            let Some(role) = self.io.timers.pop_expired(deadline) else {
                break;
            };
            self.node.on_timer(role, &mut self.io, &mut self.sink);
        }
        self.io.now_ms = target;
    }

    pub fn is_armed(&self, role: TimerRole) -> bool {
        self.io.timers.is_armed(role)
    }
}
