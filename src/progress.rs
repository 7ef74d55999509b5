//! Progress callback for the long-running pipeline stages.
//!
//! Implementations receive phase transitions and per-item progress updates.
//! With the `parallel` feature progress is emitted from rayon threads, so
//! implementations must be `Send + Sync`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Pipeline phases, ordered by execution sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Intersecting route pairs, O(R²), one item per uncompared pair
    ComparingRoutes,
    /// Splitting each route at its intersection points, one item per route
    SectioningRoutes,
    /// Enumerating section combinations and attributing freight, one item per route
    BuildingCombinations,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::ComparingRoutes => "comparing_routes",
            PipelinePhase::SectioningRoutes => "sectioning_routes",
            PipelinePhase::BuildingCombinations => "building_combinations",
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for receiving progress updates during a pipeline run.
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new phase. `total` is the number of items in this phase.
    fn on_phase(&self, phase: PipelinePhase, total: u32);
    /// Called after completing one item in the current phase.
    fn on_progress(&self);
}

/// Progress sink that ignores every update.
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: PipelinePhase, _total: u32) {}
    fn on_progress(&self) {}
}

/// Simple atomic progress tracker that can be polled from another thread.
pub struct AtomicProgressTracker {
    pub phase: Mutex<String>,
    pub completed: AtomicU32,
    pub total: AtomicU32,
    /// Phases entered so far, in order
    pub history: Mutex<Vec<PipelinePhase>>,
}

impl Default for AtomicProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(String::new()),
            completed: AtomicU32::new(0),
            total: AtomicU32::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Fraction of the current phase completed (0..1).
    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 1.0;
        }
        self.completed.load(Ordering::SeqCst) as f64 / total as f64
    }
}

impl ProgressCallback for AtomicProgressTracker {
    fn on_phase(&self, phase: PipelinePhase, total: u32) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.as_str().to_string();
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(phase);
        }
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn on_progress(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_resets_on_phase() {
        let tracker = AtomicProgressTracker::new();
        assert_eq!(tracker.fraction(), 1.0);

        tracker.on_phase(PipelinePhase::ComparingRoutes, 4);
        tracker.on_progress();
        assert_eq!(tracker.fraction(), 0.25);

        tracker.on_phase(PipelinePhase::SectioningRoutes, 2);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 0);
        assert_eq!(*tracker.phase.lock().unwrap(), "sectioning_routes");
        assert_eq!(tracker.history.lock().unwrap().len(), 2);
    }
}
