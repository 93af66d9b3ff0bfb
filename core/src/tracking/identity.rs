use crate::config::MonitorConfig;
use crate::prelude::{DisplayId, Point, TrackId, ZoneKind};
use crate::telemetry::LogManager;
use crate::tracking::monitor::Identity;
use crate::tracking::occupancy::OccupancyTracker;
use std::collections::HashMap;

/// Snapshot of an identity that vanished in the pool and may resurface
/// under a new track id.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmergedCandidate {
    pub display_id: DisplayId,
    pub position: Point,
    /// When the identity was last seen.
    pub timestamp: f64,
    pub saved: Identity,
}

impl SubmergedCandidate {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            display_id: identity.display_id,
            position: identity.last_position,
            timestamp: identity.last_seen,
            saved: identity.clone(),
        }
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.timestamp
    }
}

/// Outcome of resolving one detector track.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Known(DisplayId),
    Minted {
        display_id: DisplayId,
        from_safe: bool,
    },
    Reidentified {
        display_id: DisplayId,
        distance: f64,
        saved: Box<Identity>,
    },
    /// Pool detection granted no identity: "unknown, awaiting re-identification".
    Skip,
}

impl Resolution {
    pub fn display_id(&self) -> Option<DisplayId> {
        match self {
            Resolution::Known(id) => Some(*id),
            Resolution::Minted { display_id, .. } => Some(*display_id),
            Resolution::Reidentified { display_id, .. } => Some(*display_id),
            Resolution::Skip => None,
        }
    }
}

/// Maps volatile track ids to stable display ids.
///
/// New pool identities are capped by the largest occupancy ever observed:
/// the detector cannot tell a newcomer surfacing mid-pool from a tracked
/// swimmer whose id churned, so unexplained pool tracks beyond that bound
/// wait for re-identification instead.
#[derive(Debug)]
pub struct IdentityRegistry {
    tracks: HashMap<TrackId, DisplayId>,
    next_id: u32,
    // Insertion order breaks distance ties.
    candidates: Vec<SubmergedCandidate>,
    // Matches farther than this are still taken, only flagged in the log.
    reidentify_distance: f64,
    reidentify_window: f64,
    logger: LogManager,
}

impl IdentityRegistry {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            tracks: HashMap::new(),
            next_id: 1,
            candidates: Vec::new(),
            reidentify_distance: config.reidentify_distance_px,
            reidentify_window: config.reidentify_time_sec,
            logger: LogManager::new("identity"),
        }
    }

    pub fn resolve(
        &mut self,
        track_id: TrackId,
        position: Point,
        zone: ZoneKind,
        now: f64,
        occupancy: &OccupancyTracker,
    ) -> Resolution {
        if let Some(id) = self.tracks.get(&track_id) {
            return Resolution::Known(*id);
        }

        match zone {
            ZoneKind::Safe => {
                let display_id = self.mint(track_id);
                self.logger
                    .record(&format!("{} entered from the safe zone", display_id));
                Resolution::Minted {
                    display_id,
                    from_safe: true,
                }
            }
            ZoneKind::Outside => Resolution::Minted {
                display_id: self.mint(track_id),
                from_safe: false,
            },
            ZoneKind::Pool => {
                if let Some((index, distance)) = self.nearest_candidate(position, now) {
                    let candidate = self.candidates.remove(index);
                    self.tracks.insert(track_id, candidate.display_id);
                    self.logger.record(&format!(
                        "re-identified {} as track {} ({:.1}px away)",
                        candidate.display_id, track_id, distance
                    ));
                    if distance > self.reidentify_distance {
                        self.logger.warn(&format!(
                            "{} resurfaced {:.1}px from where it went under",
                            candidate.display_id, distance
                        ));
                    }
                    return Resolution::Reidentified {
                        display_id: candidate.display_id,
                        distance,
                        saved: Box::new(candidate.saved),
                    };
                }

                let ceiling = occupancy.max_total_seen();
                if ceiling == 0
                    || occupancy.current_total() < ceiling
                    || (self.next_id as usize) <= ceiling
                {
                    let display_id = self.mint(track_id);
                    self.logger
                        .record(&format!("new swimmer {} in the pool", display_id));
                    Resolution::Minted {
                        display_id,
                        from_safe: false,
                    }
                } else {
                    self.logger.detail(&format!(
                        "track {} held as unknown: occupancy ceiling {} reached",
                        track_id, ceiling
                    ));
                    Resolution::Skip
                }
            }
        }
    }

    fn mint(&mut self, track_id: TrackId) -> DisplayId {
        let id = DisplayId(self.next_id);
        self.next_id += 1;
        self.tracks.insert(track_id, id);
        id
    }

    fn nearest_candidate(&self, position: Point, now: f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.candidates.iter().enumerate() {
            if candidate.age(now) > self.reidentify_window {
                continue;
            }
            let distance = candidate.position.distance_to(position);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best
    }

    /// Registers a candidate unless one already exists for that identity.
    pub fn submerge(&mut self, candidate: SubmergedCandidate) -> bool {
        if self.is_submerged(candidate.display_id) {
            return false;
        }
        self.logger.record(&format!(
            "{} vanished in the pool, awaiting re-identification",
            candidate.display_id
        ));
        self.candidates.push(candidate);
        true
    }

    pub fn withdraw(&mut self, id: DisplayId) -> Option<SubmergedCandidate> {
        let index = self.candidates.iter().position(|c| c.display_id == id)?;
        Some(self.candidates.remove(index))
    }

    /// Drops candidates older than the re-identification window.
    pub fn purge_expired(&mut self, now: f64) -> Vec<DisplayId> {
        let window = self.reidentify_window;
        let mut expired = Vec::new();
        self.candidates.retain(|candidate| {
            let keep = candidate.age(now) <= window;
            if !keep {
                expired.push(candidate.display_id);
            }
            keep
        });
        for id in &expired {
            self.logger
                .detail(&format!("{} no longer eligible for re-identification", id));
        }
        expired
    }

    pub fn is_submerged(&self, id: DisplayId) -> bool {
        self.candidates.iter().any(|c| c.display_id == id)
    }

    pub fn candidates(&self) -> &[SubmergedCandidate] {
        &self.candidates
    }

    pub fn display_id_for(&self, track_id: TrackId) -> Option<DisplayId> {
        self.tracks.get(&track_id).copied()
    }

    pub fn mapped_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn next_display_id(&self) -> DisplayId {
        DisplayId(self.next_id)
    }
}
