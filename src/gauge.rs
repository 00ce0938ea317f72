//! Gauge engine.
//!
//! Owns the simulated level and moves it one unit per step.  The engine
//! itself is pure: the node service wraps each step with a publish
//! evaluation and, when the gauge moved, re-arms the stepper's timer.
//!
//! ```text
//!   step(dir)
//!     ├─ not at boundary ──▶ level ± 1 ──▶ Moved      (caller re-arms)
//!     └─ at boundary     ──▶ unchanged ──▶ AtBoundary (caller stops)
//! ```

use crate::app::ports::TimerRole;

/// Lowest gauge reading.
pub const MIN_LEVEL: u8 = 1;
/// Highest gauge reading, and the level at power-on.
pub const MAX_LEVEL: u8 = 100;

/// Which way a stepper walks the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decrease,
    Increase,
}

impl Direction {
    /// The level this direction stops at.
    pub const fn boundary(self) -> u8 {
        match self {
            Self::Decrease => MIN_LEVEL,
            Self::Increase => MAX_LEVEL,
        }
    }

    /// Timer role that drives this stepper.
    pub const fn timer(self) -> TimerRole {
        match self {
            Self::Decrease => TimerRole::Decrease,
            Self::Increase => TimerRole::Increase,
        }
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The level moved to the carried value; the stepper should continue.
    Moved(u8),
    /// The level was already at the boundary; the stepper is done.
    AtBoundary(u8),
}

impl StepOutcome {
    pub fn level(self) -> u8 {
        match self {
            Self::Moved(l) | Self::AtBoundary(l) => l,
        }
    }
}

/// The gauge reading, always within `MIN_LEVEL..=MAX_LEVEL`.
#[derive(Debug, Clone)]
pub struct Gauge {
    level: u8,
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Gauge {
    /// A full gauge.
    pub fn new() -> Self {
        Self { level: MAX_LEVEL }
    }

    /// Walk one unit toward `dir`'s boundary.
    pub fn step(&mut self, dir: Direction) -> StepOutcome {
        if self.level == dir.boundary() {
            return StepOutcome::AtBoundary(self.level);
        }
        match dir {
            Direction::Decrease => self.level -= 1,
            Direction::Increase => self.level += 1,
        }
        StepOutcome::Moved(self.level)
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}
