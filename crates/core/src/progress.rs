//! Advisory progress observers.
//!
//! Long stages report how far they got through a [`Progress`] observer. Ticks
//! never influence results.

use tracing::info;

pub trait Progress {
    fn tick(&mut self, processed: u64);

    fn finish(&mut self, _processed: u64) {}
}

/// Discards every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self, _processed: u64) {}
}

/// Emits an `info!` line per tick, labelled with the stage name.
#[derive(Debug, Clone)]
pub struct LogProgress {
    stage: &'static str,
}

impl LogProgress {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }
}

impl Progress for LogProgress {
    fn tick(&mut self, processed: u64) {
        info!("{}: {} processed", self.stage, processed);
    }

    fn finish(&mut self, processed: u64) {
        info!("{}: done after {}", self.stage, processed);
    }
}

impl<F: FnMut(u64)> Progress for F {
    fn tick(&mut self, processed: u64) {
        self(processed)
    }
}
