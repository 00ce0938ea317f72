//! Concrete mode handler functions and table builder.
//!
//! Each mode is a pair of plain `fn` pointers.  Handlers only push
//! [`Effect`]s; the service applies them after the handler returns.
//!
//! ```text
//!            fill ON                     fill OFF
//!  IDLE ────────────────▶ EMPTYING ◀──────────────▶ REFILLING
//!    │                      ▲   │        fill ON        │
//!    │                      │   │                       │
//!    │        alarm OFF     │   │ alarm ON              │ alarm ON
//!    │      (fill pending)  │   ▼                       │
//!    └──alarm ON──────────▶ ALARMED ◀───────────────────┘
//!    ▲                        │
//!    └──alarm OFF (no fill)───┘
//! ```
//!
//! A fill command received while alarmed is remembered, not acted on;
//! withdrawing it still publishes STABLE.

use super::context::{CommandContext, Effect};
use super::{ModeDescriptor, ModeId};
use crate::app::commands::TankCommand;
use crate::app::ports::TimerRole;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table.  Called once at startup.
pub fn build_mode_table() -> [ModeDescriptor; ModeId::COUNT] {
    [
        ModeDescriptor {
            name: "Idle",
            on_enter: None,
            on_command: idle_command,
        },
        ModeDescriptor {
            name: "Emptying",
            on_enter: Some(emptying_enter),
            on_command: emptying_command,
        },
        ModeDescriptor {
            name: "Refilling",
            on_enter: Some(refilling_enter),
            on_command: refilling_command,
        },
        ModeDescriptor {
            name: "Alarmed",
            on_enter: Some(alarmed_enter),
            on_command: alarmed_command,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_command(ctx: &mut CommandContext, cmd: TankCommand) -> Option<ModeId> {
    match cmd {
        TankCommand::FillRequest(true) => Some(ModeId::Emptying),
        TankCommand::FillRequest(false) => Some(ModeId::Refilling),
        TankCommand::Alarm(true) => {
            ctx.fill_pending = false;
            Some(ModeId::Alarmed)
        }
        TankCommand::Alarm(false) => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  EMPTYING
// ═══════════════════════════════════════════════════════════════════════════

fn emptying_enter(ctx: &mut CommandContext) {
    info!("fill requested: gauge decreasing");
    ctx.push(Effect::Cancel(TimerRole::Increase));
    ctx.push(Effect::Cancel(TimerRole::Resume));
    // A restart must not leave two decrease chains running.
    ctx.push(Effect::Cancel(TimerRole::Decrease));
    ctx.push(Effect::StartDecrease);
}

fn emptying_command(ctx: &mut CommandContext, cmd: TankCommand) -> Option<ModeId> {
    match cmd {
        TankCommand::FillRequest(true) => Some(ModeId::Emptying),
        TankCommand::FillRequest(false) => Some(ModeId::Refilling),
        TankCommand::Alarm(true) => {
            ctx.fill_pending = true;
            Some(ModeId::Alarmed)
        }
        // Clearing an alarm that was never raised still restarts the stepper.
        TankCommand::Alarm(false) => Some(ModeId::Emptying),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  REFILLING
// ═══════════════════════════════════════════════════════════════════════════

fn refilling_enter(ctx: &mut CommandContext) {
    info!("fill withdrawn: refilling in {} ms", ctx.resume_delay_ms);
    ctx.push(Effect::PublishStable);
    ctx.push(Effect::Cancel(TimerRole::Decrease));
    ctx.push(Effect::Cancel(TimerRole::Increase));
    ctx.push(Effect::Schedule {
        role: TimerRole::Resume,
        delay_ms: ctx.resume_delay_ms,
    });
}

fn refilling_command(ctx: &mut CommandContext, cmd: TankCommand) -> Option<ModeId> {
    match cmd {
        TankCommand::FillRequest(true) => Some(ModeId::Emptying),
        TankCommand::FillRequest(false) => Some(ModeId::Refilling),
        TankCommand::Alarm(true) => {
            ctx.fill_pending = false;
            Some(ModeId::Alarmed)
        }
        TankCommand::Alarm(false) => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALARMED
// ═══════════════════════════════════════════════════════════════════════════

fn alarmed_enter(ctx: &mut CommandContext) {
    warn!("alarm raised: gauge frozen");
    ctx.push(Effect::Cancel(TimerRole::Decrease));
    ctx.push(Effect::Cancel(TimerRole::Increase));
    ctx.push(Effect::Cancel(TimerRole::Resume));
    ctx.push(Effect::PublishStable);
}

fn alarmed_command(ctx: &mut CommandContext, cmd: TankCommand) -> Option<ModeId> {
    match cmd {
        TankCommand::FillRequest(true) => {
            warn!("fill request ON deferred while alarmed");
            ctx.fill_pending = true;
            None
        }
        TankCommand::FillRequest(false) => {
            warn!("fill request OFF while alarmed");
            ctx.fill_pending = false;
            ctx.push(Effect::PublishStable);
            None
        }
        TankCommand::Alarm(true) => Some(ModeId::Alarmed),
        TankCommand::Alarm(false) => {
            info!("alarm cleared");
            if ctx.fill_pending {
                Some(ModeId::Emptying)
            } else {
                Some(ModeId::Idle)
            }
        }
    }
}
