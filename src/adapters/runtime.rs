//! Host worker loop.
//!
//! The single logical thread the node core runs on.  It owns the
//! [`TankNode`], the transport and the [`TimerQueue`], and serializes
//! every callback: network events from the session threads arrive over a
//! channel, timer expiries are drained from the queue between them.
//!
//! ```text
//!   loop {
//!     wait for SessionEvent  (bounded by the next timer deadline)
//!     ├─ stale session     ─▶ drop
//!     ├─ Connection(ev)    ─▶ node.on_connection_event
//!     └─ Publish{..}       ─▶ node.on_incoming_publish + on_incoming_data
//!     drain expired timers ─▶ node.on_timer(role) in deadline order
//!   }
//! ```

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::adapters::mqtt::{NetEvent, SessionEvent, SessionTransport};
use crate::app::ports::{EventSink, MqttPort, QoS, SessionParams, TimerPort, TimerRole};
use crate::app::service::TankNode;
use crate::error::TransportError;
use crate::timers::TimerQueue;

/// Longest single wait when no timer is armed.
const IDLE_WAIT: Duration = Duration::from_secs(1);

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Transport plus timer queue, presented to the node as one
/// `MqttPort + TimerPort`.
pub struct HostIo<T> {
    transport: T,
    timers: TimerQueue,
    epoch: Instant,
}

impl<T: SessionTransport> HostIo<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timers: TimerQueue::new(),
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since this bundle was created.
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Time left until the earliest armed deadline, capped at [`IDLE_WAIT`].
    fn wait_budget(&self) -> Duration {
        match self.timers.next_deadline() {
            Some(deadline) => {
                Duration::from_millis(deadline.saturating_sub(self.now_ms())).min(IDLE_WAIT)
            }
            None => IDLE_WAIT,
        }
    }
}

impl<T: SessionTransport> MqttPort for HostIo<T> {
    fn connect(&mut self, session: &SessionParams) -> Result<(), TransportError> {
        self.transport.connect(session)
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), TransportError> {
        self.transport.subscribe(topic, qos)
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), TransportError> {
        self.transport.publish(topic, payload, qos, retain)
    }
}

impl<T: SessionTransport> TimerPort for HostIo<T> {
    fn schedule(&mut self, role: TimerRole, delay_ms: u32) {
        let now = self.now_ms();
        self.timers.schedule(role, delay_ms, now);
    }

    fn cancel(&mut self, role: TimerRole) {
        self.timers.cancel(role);
    }
}

// ───────────────────────────────────────────────────────────────
// Worker
// ───────────────────────────────────────────────────────────────

/// Everything the worker thread owns.
pub struct Runtime<T, S> {
    node: TankNode,
    io: HostIo<T>,
    events: Receiver<SessionEvent>,
    sink: S,
}

impl<T: SessionTransport, S: EventSink> Runtime<T, S> {
    pub fn new(node: TankNode, transport: T, events: Receiver<SessionEvent>, sink: S) -> Self {
        Self {
            node,
            io: HostIo::new(transport),
            events,
            sink,
        }
    }

    /// Start the node and loop until every event sender is gone.
    pub fn run(mut self) {
        self.start();
        while self.poll_once(None) {}
        info!("event channel closed, worker exiting");
    }

    /// Start the node (first connection attempt).
    pub fn start(&mut self) {
        self.node.start(&mut self.io, &mut self.sink);
    }

    /// Wait for at most one network event, then fire every due timer.
    ///
    /// `max_wait` further bounds the wait.  Returns `false` once the
    /// event channel is closed.
    pub fn poll_once(&mut self, max_wait: Option<Duration>) -> bool {
        let budget = match max_wait {
            Some(limit) => self.io.wait_budget().min(limit),
            None => self.io.wait_budget(),
        };

        let open = match self.events.recv_timeout(budget) {
            Ok(event) => {
                self.dispatch(event);
                true
            }
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        };

        self.fire_due_timers();
        open
    }

    pub fn node(&self) -> &TankNode {
        &self.node
    }

    pub fn io(&self) -> &HostIo<T> {
        &self.io
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let current = self.io.transport().session();
        if event.session != current {
            debug!(
                "dropping {:?} from session {} (current {})",
                event.event, event.session, current
            );
            return;
        }

        match event.event {
            NetEvent::Connection(ev) => {
                self.node.on_connection_event(ev, &mut self.io, &mut self.sink);
            }
            NetEvent::Publish { topic, payload } => {
                self.node.on_incoming_publish(&topic);
                self.node
                    .on_incoming_data(&payload, true, &mut self.io, &mut self.sink);
            }
        }
    }

    fn fire_due_timers(&mut self) {
        loop {
            let now = self.io.now_ms();
            let Some(role) = self.io.timers.pop_expired(now) else {
                break;
            };
            self.node.on_timer(role, &mut self.io, &mut self.sink);
        }
    }
}
