//! MQTT transport adapter built on `rumqttc`'s synchronous client.
//!
//! Implements [`MqttPort`].  Every [`connect`](MqttPort::connect) opens a
//! fresh session: a new `Client`/`Connection` pair and a dedicated
//! network thread that drives the connection and forwards what it sees
//! into the worker's channel.  The thread ends with its session; it never
//! reconnects on its own, that is the connection manager's job.
//!
//! ```text
//!   worker ──publish/subscribe──▶ Client ─┐
//!                                         │  (rumqttc request queue)
//!   worker ◀──SessionEvent──── mqtt-net ◀─┘  Connection::iter()
//! ```
//!
//! Events carry the session number they came from; the worker discards
//! anything older than the transport's current session.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::mpsc::Sender;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, SubscribeReasonCode};

use crate::app::ports::{ConnectionEvent, MqttPort, QoS, SessionParams};
use crate::error::{Error, Result, TransportError};

/// Depth of the rumqttc request queue between the worker and the
/// network thread.
const REQUEST_QUEUE_DEPTH: usize = 16;

// ───────────────────────────────────────────────────────────────
// Events forwarded to the worker
// ───────────────────────────────────────────────────────────────

/// What a network thread reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    Connection(ConnectionEvent),
    /// A complete inbound publish (rumqttc never splits payloads).
    Publish { topic: String, payload: Vec<u8> },
}

/// A [`NetEvent`] tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: u64,
    pub event: NetEvent,
}

/// A transport whose sessions are numbered, so stale events can be told
/// apart from live ones.
pub trait SessionTransport: MqttPort {
    /// Number of the most recently opened session (0 before the first).
    fn session(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct RumqttTransport {
    events: Sender<SessionEvent>,
    client: Option<Client>,
    session: u64,
}

impl RumqttTransport {
    pub fn new(events: Sender<SessionEvent>) -> Self {
        Self {
            events,
            client: None,
            session: 0,
        }
    }

    fn client(&mut self) -> core::result::Result<&mut Client, TransportError> {
        self.client.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl SessionTransport for RumqttTransport {
    fn session(&self) -> u64 {
        self.session
    }
}

impl MqttPort for RumqttTransport {
    fn connect(&mut self, params: &SessionParams) -> core::result::Result<(), TransportError> {
        if let Some(old) = self.client.take() {
            // Ends the previous network thread if it is still running.
            let _ = old.try_disconnect();
        }

        let mut options = MqttOptions::new(
            params.client_id.as_str(),
            params.broker.ip().to_string(),
            params.broker.port(),
        );
        options
            .set_keep_alive(Duration::from_secs(u64::from(params.keep_alive_secs)))
            .set_clean_session(true)
            .set_last_will(rumqttc::LastWill::new(
                params.last_will.topic.as_str(),
                params.last_will.payload,
                to_rumqttc(params.last_will.qos),
                params.last_will.retain,
            ));

        let (client, connection) = Client::new(options, REQUEST_QUEUE_DEPTH);

        self.session += 1;
        let session = self.session;
        let events = self.events.clone();
        let _net_thread = std::thread::Builder::new()
            .name(format!("mqtt-net-{session}"))
            .spawn(move || drive_session(session, connection, events))
            .map_err(|e| {
                error!("network thread spawn failed: {}", e);
                TransportError::ConnectFailed
            })?;

        self.client = Some(client);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> core::result::Result<(), TransportError> {
        self.client()?
            .try_subscribe(topic, to_rumqttc(qos))
            .map_err(|e| {
                warn!("subscribe '{}' refused: {}", topic, e);
                TransportError::QueueFull
            })
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> core::result::Result<(), TransportError> {
        self.client()?
            .try_publish(topic, to_rumqttc(qos), retain, payload.to_vec())
            .map_err(|e| {
                warn!("publish '{}' refused: {}", topic, e);
                TransportError::QueueFull
            })
    }
}

/// Resolve the broker once: literal address or name lookup, first
/// result wins.
pub fn resolve_broker(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs().map_err(|e| {
        error!("resolve '{}' failed: {}", host, e);
        Error::Init("broker name lookup failed")
    })?;
    addrs
        .next()
        .ok_or(Error::Init("broker name resolved to no address"))
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

// ───────────────────────────────────────────────────────────────
// Network thread
// ───────────────────────────────────────────────────────────────

/// Drive one session until it fails or the worker goes away.
fn drive_session(session: u64, mut connection: Connection, events: Sender<SessionEvent>) {
    let send = |event: NetEvent| events.send(SessionEvent { session, event }).is_ok();
    let mut accepted = false;

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    accepted = true;
                    if !send(NetEvent::Connection(ConnectionEvent::Accepted)) {
                        return;
                    }
                } else {
                    warn!("session {} refused: {:?}", session, ack.code);
                    let _ = send(NetEvent::Connection(ConnectionEvent::Rejected));
                    return;
                }
            }
            Ok(Event::Incoming(Packet::Publish(p))) => {
                let delivered = send(NetEvent::Publish {
                    topic: p.topic,
                    payload: p.payload.to_vec(),
                });
                if !delivered {
                    return;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                for code in &ack.return_codes {
                    match code {
                        SubscribeReasonCode::Success(q) => {
                            info!("subscription {} granted at {:?}", ack.pkid, q)
                        }
                        SubscribeReasonCode::Failure => {
                            warn!("subscription {} refused by broker", ack.pkid)
                        }
                    }
                }
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                debug!("publish {} acknowledged", ack.pkid);
            }
            Ok(_) => {}
            Err(e) => {
                let event = if accepted {
                    warn!("session {} dropped: {}", session, e);
                    ConnectionEvent::Disconnected
                } else {
                    warn!("session {} failed: {}", session, e);
                    ConnectionEvent::Rejected
                };
                let _ = send(NetEvent::Connection(event));
                return;
            }
        }
    }
}
