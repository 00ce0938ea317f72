//! Shared mutable context threaded through every mode handler.
//!
//! Handlers never touch the transport or the timers.  They append
//! [`Effect`]s here and the node service applies them through the ports
//! once the handler returns, in the order they were pushed.

use log::warn;

use crate::app::ports::TimerRole;

/// Capacity of the per-command effect list.  The largest `on_enter`
/// pushes four.
const MAX_EFFECTS: usize = 8;

/// A side effect requested by a mode handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Disarm a timer role.
    Cancel(TimerRole),
    /// Arm a timer role.
    Schedule { role: TimerRole, delay_ms: u32 },
    /// Run one decrease step now; it re-arms itself while the gauge moves.
    StartDecrease,
    /// Publish `STABLE` on the fill-state topic immediately.
    PublishStable,
}

/// The context passed to every mode handler.
pub struct CommandContext {
    /// Fill request remembered while the alarm holds the gauge frozen.
    /// Only meaningful in `Alarmed`.
    pub fill_pending: bool,
    /// Delay before refilling starts after a fill request ends.
    pub resume_delay_ms: u32,
    effects: heapless::Vec<Effect, MAX_EFFECTS>,
}

impl CommandContext {
    pub fn new(resume_delay_ms: u32) -> Self {
        Self {
            fill_pending: false,
            resume_delay_ms,
            effects: heapless::Vec::new(),
        }
    }

    /// Queue an effect for the service to apply.
    pub fn push(&mut self, effect: Effect) {
        if self.effects.push(effect).is_err() {
            warn!("effect list full, dropping {:?}", effect);
        }
    }

    /// Hand the queued effects to the caller, leaving the list empty.
    pub fn take_effects(&mut self) -> heapless::Vec<Effect, MAX_EFFECTS> {
        core::mem::take(&mut self.effects)
    }

    pub fn pending_effects(&self) -> &[Effect] {
        &self.effects
    }
}
