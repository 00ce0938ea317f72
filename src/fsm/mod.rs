//! Function-pointer mode machine for the command handler.
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │  ModeTable                                        │
//! │  ┌───────────┬───────────┬──────────────────────┐ │
//! │  │ ModeId    │ on_enter  │ on_command           │ │
//! │  ├───────────┼───────────┼──────────────────────┤ │
//! │  │ Idle      │ -         │ fn(ctx,cmd)->Option<>│ │
//! │  │ Emptying  │ fn(ctx)   │ fn(ctx,cmd)->Option<>│ │
//! │  │ Refilling │ fn(ctx)   │ fn(ctx,cmd)->Option<>│ │
//! │  │ Alarmed   │ fn(ctx)   │ fn(ctx,cmd)->Option<>│ │
//! │  └───────────┴───────────┴──────────────────────┘ │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Each inbound command is handed to `on_command` of the **current**
//! mode.  If it returns `Some(next)`, the engine switches to `next` and
//! runs its `on_enter`.  Returning the current mode is a re-entry:
//! `on_enter` runs again, which is how a repeated command restarts its
//! stepper.  No mode needs teardown; every entry cancels what it must.
//!
//! The mode replaces the `fill requested` / `alarm active` flag pair:
//! both are derived from it, so no unintended flag combination exists.

pub mod context;
pub mod states;

use context::CommandContext;
use log::info;

use crate::app::commands::TankCommand;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// What the tank is currently doing.
/// Must stay in sync with the table built in [`states::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModeId {
    /// No command received yet, or alarm cleared with no fill pending.
    Idle = 0,
    /// Fill requested: the gauge walks down.
    Emptying = 1,
    /// Fill request withdrawn: pause, then the gauge walks up.
    Refilling = 2,
    /// Alarm active: the gauge is frozen.
    Alarmed = 3,
}

impl ModeId {
    /// Total number of modes, used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert an index back to `ModeId`.  Panics on out-of-range in
    /// debug builds; returns `Alarmed` (frozen) in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Emptying,
            2 => Self::Refilling,
            3 => Self::Alarmed,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Alarmed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions.
pub type ModeActionFn = fn(&mut CommandContext);

/// Signature for the command handler.
/// Returns `Some(next)` to transition (or re-enter), `None` to stay put.
pub type ModeCommandFn = fn(&mut CommandContext, TankCommand) -> Option<ModeId>;

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single mode.
pub struct ModeDescriptor {
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_command: ModeCommandFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The mode machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `ModeId as usize`.
    table: [ModeDescriptor; ModeId::COUNT],
    /// Index of the current mode.
    current: usize,
    /// Number of transitions taken, re-entries included.
    transitions: u64,
}

impl Fsm {
    /// Construct a new FSM with the given table, starting in `initial`.
    pub fn new(table: [ModeDescriptor; ModeId::COUNT], initial: ModeId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting mode.
    pub fn start(&mut self, ctx: &mut CommandContext) {
        info!("FSM starting in mode: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Dispatch one command to the current mode.
    ///
    /// Returns the mode entered, if any (possibly the same one).
    pub fn handle(&mut self, cmd: TankCommand, ctx: &mut CommandContext) -> Option<ModeId> {
        let next = (self.table[self.current].on_command)(ctx, cmd)?;
        self.transition(next, ctx);
        Some(next)
    }

    /// The current mode's identity.
    pub fn current_mode(&self) -> ModeId {
        ModeId::from_index(self.current)
    }

    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ModeId, ctx: &mut CommandContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;
        self.transitions += 1;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
