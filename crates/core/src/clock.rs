//! Fixed-timestep clock
//!
//! Turns irregular wall-clock deltas into whole simulation steps. Leftover
//! time carries over to the next call; stopping drops it.

use crate::types::TICK_MS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    step_ms: u32,
    accumulator_ms: u32,
    running: bool,
}

impl TickClock {
    pub fn new(step_ms: u32) -> Self {
        Self {
            step_ms: step_ms.max(1),
            accumulator_ms: 0,
            running: false,
        }
    }

    /// Start ticking; no effect if already running
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.accumulator_ms = 0;
        }
    }

    /// Stop ticking; safe to call repeatedly
    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator_ms = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn step_ms(&self) -> u32 {
        self.step_ms
    }

    /// Feed elapsed wall time, returning how many whole steps are due
    pub fn advance(&mut self, elapsed_ms: u32) -> u32 {
        if !self.running {
            return 0;
        }
        self.accumulator_ms = self.accumulator_ms.saturating_add(elapsed_ms);
        let steps = self.accumulator_ms / self.step_ms;
        self.accumulator_ms %= self.step_ms;
        steps
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(TICK_MS)
    }
}
