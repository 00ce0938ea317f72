//! Port traits: the hexagonal boundary between the node core and its
//! external collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TankNode (domain)
//! ```
//!
//! The core never touches a socket or a clock.  The pub/sub transport
//! implements [`MqttPort`], the timer substrate implements [`TimerPort`],
//! and [`TankNode`](super::service::TankNode) consumes both via generics.

use core::net::SocketAddr;

use crate::config::Topic;
use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Pub/sub transport port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Message the broker publishes on our behalf if the session dies uncleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    pub topic: Topic,
    pub payload: &'static str,
    pub qos: QoS,
    pub retain: bool,
}

/// Everything the transport needs to open a session.
///
/// Built once at startup and reused for every reconnect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub client_id: heapless::String<48>,
    pub broker: SocketAddr,
    pub keep_alive_secs: u16,
    pub last_will: LastWill,
}

/// Outbound side of the pub/sub client.
///
/// None of these calls block on a network round trip: they queue the
/// request and return.  Results of a connect attempt arrive later as a
/// [`ConnectionEvent`] fed to the node.
pub trait MqttPort {
    /// Start a session attempt.  `Err` means the attempt never started.
    fn connect(&mut self, session: &SessionParams) -> Result<(), TransportError>;

    /// Queue a subscription on the open session.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError>;

    /// Queue a publish on the open session.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), TransportError>;
}

/// Connection status reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The broker accepted the session.
    Accepted,
    /// The broker refused the session or the attempt failed.
    Rejected,
    /// An established session dropped.
    Disconnected,
}

// ───────────────────────────────────────────────────────────────
// Timer substrate port (driven adapter: domain → scheduler)
// ───────────────────────────────────────────────────────────────

/// Identity of a scheduled one-shot callback.
///
/// Each role maps to at most one live timer: scheduling a role that is
/// already armed replaces it, cancelling a role that is not armed is a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerRole {
    /// Next decrease step of the gauge.
    Decrease = 0,
    /// Next increase step of the gauge.
    Increase = 1,
    /// Delayed start of refilling after a fill request ends.
    Resume = 2,
    /// Next connection attempt.
    Reconnect = 3,
    /// Deferred availability announcement after a session is accepted.
    Announce = 4,
}

impl TimerRole {
    /// Total number of roles, used to size slot arrays.
    pub const COUNT: usize = 5;

    pub const ALL: [TimerRole; Self::COUNT] = [
        Self::Decrease,
        Self::Increase,
        Self::Resume,
        Self::Reconnect,
        Self::Announce,
    ];
}

/// Schedule-after-delay and cancel-by-role.  The only concurrency
/// primitives the core depends on.
pub trait TimerPort {
    /// Arm `role` to fire once after `delay_ms`.
    fn schedule(&mut self, role: TimerRole, delay_ms: u32);

    /// Disarm `role` if it is pending.
    fn cancel(&mut self, role: TimerRole);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
