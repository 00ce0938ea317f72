//! Node service, the hexagonal core.
//!
//! [`TankNode`] owns the gauge, the publish policy, the mode machine and
//! the connection manager.  Every callback of the runtime (network event,
//! inbound publish, timer expiry) lands on one of its `on_*` methods,
//! serialized on a single thread.  All I/O flows through port traits
//! injected at call sites, so the whole node runs against mock adapters.
//!
//! ```text
//!  ConnectionEvent ──▶ ┌──────────────────────────────┐ ──▶ MqttPort
//!  inbound publish ──▶ │           TankNode           │ ──▶ TimerPort
//!  timer expiry    ──▶ │ Conn · Modes · Gauge · Policy│ ──▶ EventSink
//!                      └──────────────────────────────┘
//! ```

use log::{debug, info};

use crate::config::{NodeConfig, TopicConfig};
use crate::connection::{ConnectionManager, ConnectionStatus};
use crate::fsm::context::{CommandContext, Effect};
use crate::fsm::states::build_mode_table;
use crate::fsm::{Fsm, ModeId};
use crate::gauge::{Direction, Gauge, StepOutcome};
use crate::publish::{self, PublishPolicy, Trend};

use super::commands::{SubscriptionTopic, TankCommand, bounded_payload};
use super::events::AppEvent;
use super::ports::{ConnectionEvent, EventSink, MqttPort, SessionParams, TimerPort, TimerRole};

// ───────────────────────────────────────────────────────────────
// TankNode
// ───────────────────────────────────────────────────────────────

/// The single long-lived node context.
pub struct TankNode {
    topics: TopicConfig,
    step_interval_ms: u32,
    connection: ConnectionManager,
    gauge: Gauge,
    policy: PublishPolicy,
    fsm: Fsm,
    ctx: CommandContext,
    /// Topic of the publish whose payload is expected next.
    pending_topic: SubscriptionTopic,
}

impl TankNode {
    /// Construct the node from configuration and the session parameters
    /// resolved at startup.
    ///
    /// Does **not** connect; call [`start`](Self::start) next.
    pub fn new(config: &NodeConfig, session: SessionParams) -> Self {
        let gauge = Gauge::new();
        let policy = PublishPolicy::new(gauge.level());
        Self {
            topics: config.topics.clone(),
            step_interval_ms: config.step_interval_ms,
            connection: ConnectionManager::new(session, config),
            gauge,
            policy,
            fsm: Fsm::new(build_mode_table(), ModeId::Idle),
            ctx: CommandContext::new(config.resume_delay_ms),
            pending_topic: SubscriptionTopic::None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter the initial mode and start the first connection attempt.
    pub fn start(&mut self, io: &mut (impl MqttPort + TimerPort), sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.apply_effects(io, sink);
        sink.emit(&AppEvent::Started(self.fsm.current_mode()));
        info!("TankNode started in {:?}, level {}", self.fsm.current_mode(), self.gauge.level());
        self.connection.connect(io, sink);
    }

    // ── Runtime callbacks ─────────────────────────────────────

    /// A timer armed through the [`TimerPort`] has fired.
    pub fn on_timer(
        &mut self,
        role: TimerRole,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        let mode = self.fsm.current_mode();
        match role {
            TimerRole::Decrease if mode == ModeId::Emptying => {
                self.step(Direction::Decrease, io, sink);
            }
            TimerRole::Increase | TimerRole::Resume if mode == ModeId::Refilling => {
                self.step(Direction::Increase, io, sink);
            }
            TimerRole::Decrease | TimerRole::Increase | TimerRole::Resume => {
                // Cancellation is best-effort; a firing that raced it is dropped.
                debug!("stale {:?} timer ignored in {:?}", role, mode);
            }
            TimerRole::Reconnect => self.connection.connect(io, sink),
            TimerRole::Announce => self.announce(io, sink),
        }
    }

    /// The transport reported a session status change.
    pub fn on_connection_event(
        &mut self,
        event: ConnectionEvent,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        self.connection.on_event(event, &self.topics, io, sink);
    }

    /// First phase of an inbound publish: the topic.
    pub fn on_incoming_publish(&mut self, topic: &str) {
        self.pending_topic = SubscriptionTopic::classify(topic, &self.topics);
        debug!("inbound publish on '{}' -> {:?}", topic, self.pending_topic);
    }

    /// Second phase of an inbound publish: a payload chunk.  Only the
    /// final chunk (`last == true`) is acted on.
    pub fn on_incoming_data(
        &mut self,
        data: &[u8],
        last: bool,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        if !last {
            debug!("partial payload chunk of {} bytes skipped", data.len());
            return;
        }

        let payload = bounded_payload(data);
        let topic = core::mem::take(&mut self.pending_topic);
        info!(
            "payload {:?} on {:?}",
            core::str::from_utf8(&payload).unwrap_or("<binary>"),
            topic
        );

        match TankCommand::decode(topic, &payload) {
            Some(cmd) => self.handle_command(cmd, io, sink),
            None => sink.emit(&AppEvent::PayloadIgnored { len: data.len() }),
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Run a decoded command through the mode machine and apply whatever
    /// the mode handlers asked for.
    pub fn handle_command(
        &mut self,
        cmd: TankCommand,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        sink.emit(&AppEvent::CommandReceived(cmd));
        let from = self.fsm.current_mode();
        if let Some(to) = self.fsm.handle(cmd, &mut self.ctx) {
            sink.emit(&AppEvent::ModeChanged { from, to });
        }
        self.apply_effects(io, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn level(&self) -> u8 {
        self.gauge.level()
    }

    pub fn mode(&self) -> ModeId {
        self.fsm.current_mode()
    }

    /// True while a fill request is active, including one deferred by an
    /// active alarm.
    pub fn fill_requested(&self) -> bool {
        match self.fsm.current_mode() {
            ModeId::Emptying => true,
            ModeId::Alarmed => self.ctx.fill_pending,
            ModeId::Idle | ModeId::Refilling => false,
        }
    }

    pub fn alarm_active(&self) -> bool {
        self.fsm.current_mode() == ModeId::Alarmed
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn last_published_level(&self) -> u8 {
        self.policy.last_published_level()
    }

    pub fn last_published_trend(&self) -> Option<Trend> {
        self.policy.last_published_trend()
    }

    pub fn pending_topic(&self) -> SubscriptionTopic {
        self.pending_topic
    }

    // ── Internal ──────────────────────────────────────────────

    /// One gauge step followed by a publish evaluation.  Re-arms the
    /// stepper only when the gauge actually moved.
    fn step(
        &mut self,
        dir: Direction,
        io: &mut (impl MqttPort + TimerPort),
        sink: &mut impl EventSink,
    ) {
        let outcome = self.gauge.step(dir);
        let publications = self.policy.observe(outcome.level());
        publish::send(&publications, &self.topics, io, sink);

        match outcome {
            StepOutcome::Moved(_) => io.schedule(dir.timer(), self.step_interval_ms),
            StepOutcome::AtBoundary(level) => info!("gauge settled at {}", level),
        }
    }

    fn announce(&mut self, io: &mut (impl MqttPort + TimerPort), sink: &mut impl EventSink) {
        let publications = self.policy.announce(self.gauge.level());
        publish::send(&publications, &self.topics, io, sink);
    }

    fn apply_effects(&mut self, io: &mut (impl MqttPort + TimerPort), sink: &mut impl EventSink) {
        for effect in self.ctx.take_effects() {
            match effect {
                Effect::Cancel(role) => io.cancel(role),
                Effect::Schedule { role, delay_ms } => io.schedule(role, delay_ms),
                Effect::StartDecrease => self.step(Direction::Decrease, io, sink),
                Effect::PublishStable => {
                    let stable = self.policy.force_stable();
                    publish::send(&[stable], &self.topics, io, sink);
                }
            }
        }
    }
}
