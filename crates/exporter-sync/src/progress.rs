//! Sync progress tracking

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// What the driver is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    /// Waiting between passes
    Idle,
    /// Exporting heights
    Syncing,
    /// Rebuilding from staged data
    Refining,
    /// Caught up with the node
    Complete,
}

impl SyncStage {
    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Syncing => "Syncing",
            Self::Refining => "Refining",
            Self::Complete => "Complete",
        }
    }
}

#[derive(Debug)]
struct ProgressInner {
    start_height: i64,
    current_height: i64,
    target_height: i64,
    stage: SyncStage,
    start_time: Option<Instant>,
    blocks_per_second: f64,
    eta_seconds: Option<u64>,
    committed: u64,
}

impl ProgressInner {
    fn percentage(&self) -> f64 {
        if self.target_height == 0 {
            return 0.0;
        }
        if self.current_height >= self.target_height {
            return 100.0;
        }
        if self.target_height <= self.start_height {
            return 0.0;
        }
        let total = self.target_height - self.start_height;
        let done = (self.current_height - self.start_height).max(0);
        (done as f64 / total as f64) * 100.0
    }
}

/// Progress shared between the driver and observers
#[derive(Debug, Clone)]
pub struct SyncProgress {
    inner: Arc<RwLock<ProgressInner>>,
}

impl SyncProgress {
    /// Create new progress tracker
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ProgressInner {
                start_height: 0,
                current_height: 0,
                target_height: 0,
                stage: SyncStage::Idle,
                start_time: None,
                blocks_per_second: 0.0,
                eta_seconds: None,
                committed: 0,
            })),
        }
    }

    /// Begin a pass from `begin` (exclusive) to `target`
    pub fn start(&self, begin: i64, target: i64, stage: SyncStage) {
        let mut inner = self.inner.write();
        inner.start_height = begin;
        inner.current_height = begin;
        inner.target_height = target;
        inner.stage = stage;
        inner.start_time = Some(Instant::now());
        inner.eta_seconds = None;
    }

    /// Record a committed height
    pub fn set_current(&self, height: i64) {
        let mut inner = self.inner.write();
        inner.current_height = height;
        inner.committed += 1;

        if let Some(start_time) = inner.start_time {
            let elapsed = start_time.elapsed().as_secs_f64();
            let done = (inner.current_height - inner.start_height).max(0) as f64;
            let remaining = (inner.target_height - inner.current_height).max(0) as f64;
            if done > 0.0 && elapsed > 0.0 {
                inner.blocks_per_second = done / elapsed;
                inner.eta_seconds = Some((remaining / inner.blocks_per_second) as u64);
            }
        }
    }

    /// Set stage
    pub fn set_stage(&self, stage: SyncStage) {
        self.inner.write().stage = stage;
    }

    /// Get progress percentage of the current pass
    pub fn percentage(&self) -> f64 {
        self.inner.read().percentage()
    }

    /// Get current height
    pub fn current_height(&self) -> i64 {
        self.inner.read().current_height
    }

    /// Get target height
    pub fn target_height(&self) -> i64 {
        self.inner.read().target_height
    }

    /// Get current stage
    pub fn stage(&self) -> SyncStage {
        self.inner.read().stage
    }

    /// Heights committed since the process started
    pub fn committed(&self) -> u64 {
        self.inner.read().committed
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        let inner = self.inner.read();
        let eta_str = match inner.eta_seconds {
            Some(secs) if secs > 0 => format!("ETA: {}m {}s", secs / 60, secs % 60),
            Some(_) => "ETA: done".to_string(),
            None => "ETA: calculating...".to_string(),
        };
        format!(
            "{} | {}/{} ({:.1}%) | {:.1} blocks/s | {} committed | {}",
            inner.stage.name(),
            inner.current_height,
            inner.target_height,
            inner.percentage(),
            inner.blocks_per_second,
            inner.committed,
            eta_str
        )
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::new()
    }
}
