//! Outbound application events.
//!
//! The [`TankNode`](super::service::TankNode) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the shipped one logs them.

use crate::app::commands::TankCommand;
use crate::app::ports::ConnectionEvent;
use crate::connection::ConnectionStatus;
use crate::error::TransportError;
use crate::fsm::ModeId;
use crate::publish::{Channel, Publication};

/// Structured events emitted by the node core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The node has started (carries initial mode).
    Started(ModeId),

    /// The connection state machine moved.
    ConnectionChanged {
        from: ConnectionStatus,
        to: ConnectionStatus,
    },

    /// A connection event arrived that the current status does not expect.
    ConnectionEventIgnored {
        status: ConnectionStatus,
        event: ConnectionEvent,
    },

    /// A reconnect attempt has been armed.
    ReconnectScheduled { delay_ms: u32 },

    /// A subscription request was queued or refused.
    Subscribed {
        topic: crate::config::Topic,
        result: Result<(), TransportError>,
    },

    /// The mode machine transitioned (or re-entered when `from == to`).
    ModeChanged { from: ModeId, to: ModeId },

    /// A decoded command reached the mode machine.
    CommandReceived(TankCommand),

    /// A payload arrived with no recognised topic in flight.
    PayloadIgnored { len: usize },

    /// A publish was handed to the transport.
    Published(Publication),

    /// The transport refused a publish.  Not retried.
    PublishFailed {
        channel: Channel,
        error: TransportError,
    },
}
