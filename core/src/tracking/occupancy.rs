use crate::prelude::{DisplayId, ZoneKind};
use crate::telemetry::LogManager;
use serde::Serialize;
use std::collections::BTreeSet;

/// Zone membership for one frame plus the running maxima.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OccupancySnapshot {
    pub pool: BTreeSet<DisplayId>,
    pub safe: BTreeSet<DisplayId>,
    pub max_total_seen: usize,
    pub max_pool_seen: usize,
}

impl OccupancySnapshot {
    pub fn total(&self) -> usize {
        self.pool.len() + self.safe.len()
    }
}

/// Per-frame bookkeeping of who stands in which zone.
///
/// The maxima survive across frames and bound identity creation in the
/// registry; the member sets are rebuilt every frame.
#[derive(Debug)]
pub struct OccupancyTracker {
    pool: BTreeSet<DisplayId>,
    safe: BTreeSet<DisplayId>,
    max_total_seen: usize,
    max_pool_seen: usize,
    logger: LogManager,
}

impl OccupancyTracker {
    pub fn new() -> Self {
        Self {
            pool: BTreeSet::new(),
            safe: BTreeSet::new(),
            max_total_seen: 0,
            max_pool_seen: 0,
            logger: LogManager::new("occupancy"),
        }
    }

    pub fn begin_frame(&mut self) {
        self.pool.clear();
        self.safe.clear();
    }

    /// Records a sighting; outside-zone sightings are not counted.
    pub fn record(&mut self, id: DisplayId, zone: ZoneKind) -> bool {
        match zone {
            ZoneKind::Pool => {
                self.safe.remove(&id);
                self.pool.insert(id)
            }
            ZoneKind::Safe => {
                self.pool.remove(&id);
                self.safe.insert(id)
            }
            ZoneKind::Outside => false,
        }
    }

    /// Members recorded so far in the frame being built.
    pub fn current_total(&self) -> usize {
        self.pool.len() + self.safe.len()
    }

    pub fn end_frame(&mut self) -> OccupancySnapshot {
        let total = self.current_total();
        if total > self.max_total_seen {
            self.max_total_seen = total;
            self.logger.record(&format!(
                "max occupancy now {} (pool {}, safe {})",
                total,
                self.pool.len(),
                self.safe.len()
            ));
        }
        if self.pool.len() > self.max_pool_seen {
            self.max_pool_seen = self.pool.len();
            self.logger
                .record(&format!("max pool occupancy now {}", self.max_pool_seen));
        }
        OccupancySnapshot {
            pool: self.pool.clone(),
            safe: self.safe.clone(),
            max_total_seen: self.max_total_seen,
            max_pool_seen: self.max_pool_seen,
        }
    }

    pub fn max_total_seen(&self) -> usize {
        self.max_total_seen
    }

    pub fn max_pool_seen(&self) -> usize {
        self.max_pool_seen
    }
}

impl Default for OccupancyTracker {
    fn default() -> Self {
        Self::new()
    }
}
