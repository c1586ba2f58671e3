//! Per-frame tick loop with cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::simulation::FluidSimulation;

/// Shared flag that stops a [`FrameLoop`] between ticks.
///
/// Cancelling never aborts GPU work already submitted.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Issues one step per frame until cancelled or `max_ticks` is reached.
///
/// Each step is submitted before the next one is encoded; the loop never
/// waits for GPU completion between ticks.
pub struct FrameLoop {
    cancel: CancellationToken,
    max_ticks: Option<u64>,
}

impl FrameLoop {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run the loop. `on_frame` is called after every submitted step with the
    /// frame index and may cancel through the token.
    ///
    /// Returns the number of steps issued.
    pub fn run<F>(&self, sim: &mut FluidSimulation, mut on_frame: F) -> u64
    where
        F: FnMut(&mut FluidSimulation, u64),
    {
        let mut frames = 0u64;
        while !self.cancel.is_cancelled() {
            if self.max_ticks.is_some_and(|max| frames >= max) {
                break;
            }
            sim.step();
            on_frame(sim, frames);
            frames += 1;
        }
        log::debug!("Frame loop stopped after {frames} steps");
        frames
    }
}
