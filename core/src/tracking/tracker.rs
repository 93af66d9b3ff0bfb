use crate::config::MonitorConfig;
use crate::interface::DetectionFrame;
use crate::prelude::{DisplayId, MonitorError, MonitorResult, Point, TrackId, ZoneKind};
use crate::telemetry::LogManager;
use crate::tracking::identity::{IdentityRegistry, Resolution};
use crate::tracking::monitor::{AlertRequest, MissingPersonMonitor, RescueTarget};
use crate::tracking::occupancy::{OccupancySnapshot, OccupancyTracker};
use crate::tracking::zone::{ZoneClassifier, ZoneSet};
use serde::Serialize;
use std::collections::HashSet;

/// How one accepted detection was interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub track_id: TrackId,
    /// `None` when the track is held as unknown.
    pub display_id: Option<DisplayId>,
    pub position: Point,
    pub zone: ZoneKind,
    pub reidentified: bool,
}

/// Result of one `Tracker::process` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub timestamp: f64,
    pub observations: Vec<Observation>,
    pub occupancy: OccupancySnapshot,
    pub missing_in_pool: usize,
    pub submerged: Vec<DisplayId>,
    pub alerts: Vec<AlertRequest>,
    /// Detections dropped by the class, confidence or track-id filters.
    pub ignored: usize,
    /// Filled in by the session once the dispatcher has ruled on `alerts`.
    pub alerts_dispatched: usize,
}

impl FrameReport {
    pub fn unknown_tracks(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.display_id.is_none())
            .count()
    }

    pub fn reidentified(&self) -> usize {
        self.observations.iter().filter(|o| o.reidentified).count()
    }
}

/// Owns every piece of per-swimmer state and runs the per-frame flow.
pub struct Tracker {
    config: MonitorConfig,
    classifier: ZoneClassifier,
    registry: IdentityRegistry,
    occupancy: OccupancyTracker,
    monitor: MissingPersonMonitor,
    logger: LogManager,
}

impl Tracker {
    pub fn new(config: MonitorConfig, zones: ZoneSet) -> MonitorResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: IdentityRegistry::new(&config),
            monitor: MissingPersonMonitor::new(&config),
            classifier: ZoneClassifier::new(zones),
            occupancy: OccupancyTracker::new(),
            config,
            logger: LogManager::new("tracker"),
        })
    }

    pub fn process(&mut self, frame: &DetectionFrame) -> MonitorResult<FrameReport> {
        if !frame.timestamp.is_finite() {
            return Err(MonitorError::InvalidFrame(format!(
                "timestamp {} is not a finite number",
                frame.timestamp
            )));
        }
        let now = frame.timestamp;
        let mut report = FrameReport {
            timestamp: now,
            ..FrameReport::default()
        };
        let mut seen = HashSet::new();

        self.occupancy.begin_frame();
        for detection in &frame.detections {
            if detection.class_id != self.config.person_class_id
                || detection.confidence < self.config.confidence_threshold
            {
                report.ignored += 1;
                continue;
            }
            let Some(track_id) = detection.track_id else {
                report.ignored += 1;
                continue;
            };

            let position = detection.bbox.center();
            let zone = self.classifier.classify(position);
            let resolution =
                self.registry
                    .resolve(track_id, position, zone, now, &self.occupancy);
            let reidentified = matches!(resolution, Resolution::Reidentified { .. });

            let (id, from_safe) = match resolution {
                Resolution::Known(id) => (id, false),
                Resolution::Minted {
                    display_id,
                    from_safe,
                } => (display_id, from_safe),
                Resolution::Reidentified {
                    display_id, saved, ..
                } => {
                    self.monitor.restore(*saved, position, now);
                    (display_id, false)
                }
                Resolution::Skip => {
                    report.observations.push(Observation {
                        track_id,
                        display_id: None,
                        position,
                        zone,
                        reidentified: false,
                    });
                    continue;
                }
            };

            self.registry.withdraw(id);
            self.occupancy.record(id, zone);
            self.monitor.observe(id, position, zone, now, from_safe);
            seen.insert(id);
            report.observations.push(Observation {
                track_id,
                display_id: Some(id),
                position,
                zone,
                reidentified,
            });
        }

        report.occupancy = self.occupancy.end_frame();
        report.alerts = self.monitor.evaluate(&seen, now, &mut self.registry);
        self.registry.purge_expired(now);
        report.missing_in_pool = self.monitor.missing_in_pool();
        report.submerged = self
            .registry
            .candidates()
            .iter()
            .map(|c| c.display_id)
            .collect();

        if !report.alerts.is_empty() {
            self.logger.detail(&format!(
                "t={:.2}s: {} alert request(s)",
                now,
                report.alerts.len()
            ));
        }
        Ok(report)
    }

    pub fn rescue(&mut self, target: RescueTarget) -> Vec<DisplayId> {
        self.monitor.rescue(target, &mut self.registry)
    }

    pub fn acknowledge(&mut self, id: DisplayId) -> bool {
        self.monitor.acknowledge(id)
    }

    pub fn reconfigure_zones(&mut self, zones: ZoneSet) {
        self.logger.record(&format!(
            "zones reconfigured (pool: {}, safe: {})",
            zones.pool.is_some(),
            zones.safe.is_some()
        ));
        self.classifier.reconfigure(zones);
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ZoneClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &MissingPersonMonitor {
        &self.monitor
    }

    pub fn occupancy(&self) -> &OccupancyTracker {
        &self.occupancy
    }
}
