//! Broker connection lifecycle and retry policy.
//!
//! ```text
//!  DISCONNECTED ──connect()──▶ CONNECTING ──accepted──▶ CONNECTED
//!       ▲                          │                        │
//!       │     rejected / error     │                        │
//!       ├──────(long backoff)──────┘                        │
//!       │                                                   │
//!       └─────────────────(short backoff)─── disconnected ──┘
//! ```
//!
//! On acceptance both inbound topics are subscribed and the availability
//! announcement is deferred to the timer substrate with zero delay, so it
//! runs after the connection callback has returned.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ConnectionEvent, EventSink, MqttPort, QoS, SessionParams, TimerPort, TimerRole};
use crate::config::{NodeConfig, TopicConfig};

/// Both inbound topics are subscribed with this guarantee.
pub const SUBSCRIBE_QOS: QoS = QoS::AtLeastOnce;

/// Where the broker session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the live session state and the fixed session parameters.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    status: ConnectionStatus,
    session: SessionParams,
    reconnect_short_ms: u32,
    reconnect_long_ms: u32,
    attempts: u32,
}

impl ConnectionManager {
    pub fn new(session: SessionParams, config: &NodeConfig) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            session,
            reconnect_short_ms: config.reconnect_short_ms,
            reconnect_long_ms: config.reconnect_long_ms,
            attempts: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Connection attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start a session attempt.  Refused unless currently disconnected.
    pub fn connect(
        &mut self,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        if self.status != ConnectionStatus::Disconnected {
            warn!("connect() refused: already {:?}", self.status);
            return;
        }

        self.set_status(ConnectionStatus::Connecting, sink);
        self.attempts += 1;
        info!(
            "connecting to {} as {} (attempt {})",
            self.session.broker,
            self.session.client_id,
            self.attempts
        );

        if let Err(e) = io.connect(&self.session) {
            error!("connect request failed: {}", e);
            self.fail_attempt(io, sink);
        }
    }

    /// Feed a status report from the transport.
    pub fn on_event(
        &mut self,
        event: ConnectionEvent,
        topics: &TopicConfig,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        match (self.status, event) {
            (ConnectionStatus::Connecting, ConnectionEvent::Accepted) => {
                self.set_status(ConnectionStatus::Connected, sink);
                for topic in [&topics.fill_request, &topics.alarm] {
                    let result = io.subscribe(topic, SUBSCRIBE_QOS);
                    sink.emit(&AppEvent::Subscribed {
                        topic: topic.clone(),
                        result,
                    });
                }
                io.schedule(TimerRole::Announce, 0);
            }
            (
                ConnectionStatus::Connecting,
                ConnectionEvent::Rejected | ConnectionEvent::Disconnected,
            ) => {
                warn!("broker rejected the session");
                self.fail_attempt(io, sink);
            }
            (
                ConnectionStatus::Connected,
                ConnectionEvent::Disconnected | ConnectionEvent::Rejected,
            ) => {
                warn!("session dropped");
                io.cancel(TimerRole::Announce);
                self.set_status(ConnectionStatus::Disconnected, sink);
                self.schedule_reconnect(self.reconnect_short_ms, io, sink);
            }
            (status, event) => {
                sink.emit(&AppEvent::ConnectionEventIgnored { status, event });
            }
        }
    }

    fn fail_attempt(&mut self, io: &mut impl TimerPort, sink: &mut impl EventSink) {
        self.set_status(ConnectionStatus::Disconnected, sink);
        self.schedule_reconnect(self.reconnect_long_ms, io, sink);
    }

    fn schedule_reconnect(&self, delay_ms: u32, io: &mut impl TimerPort, sink: &mut impl EventSink) {
        io.schedule(TimerRole::Reconnect, delay_ms);
        sink.emit(&AppEvent::ReconnectScheduled { delay_ms });
    }

    fn set_status(&mut self, to: ConnectionStatus, sink: &mut impl EventSink) {
        let from = self.status;
        self.status = to;
        sink.emit(&AppEvent::ConnectionChanged { from, to });
    }
}
