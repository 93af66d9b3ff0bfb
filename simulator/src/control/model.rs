use poolwatchcore::telemetry::MetricsSnapshot;
use poolwatchcore::tracking::{AlertRequest, FrameReport};
use poolwatchcore::DisplayId;
use serde::{Deserialize, Serialize};

/// Condensed view of the most recent frame for operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameSummary {
    pub timestamp: f64,
    pub in_pool: Vec<DisplayId>,
    pub in_safe: Vec<DisplayId>,
    pub max_total_seen: usize,
    pub missing_in_pool: usize,
    pub submerged: Vec<DisplayId>,
    pub unknown_tracks: usize,
    pub alerts: Vec<AlertRequest>,
}

impl From<&FrameReport> for FrameSummary {
    fn from(report: &FrameReport) -> Self {
        Self {
            timestamp: report.timestamp,
            in_pool: report.occupancy.pool.iter().copied().collect(),
            in_safe: report.occupancy.safe.iter().copied().collect(),
            max_total_seen: report.occupancy.max_total_seen,
            missing_in_pool: report.missing_in_pool,
            submerged: report.submerged.clone(),
            unknown_tracks: report.unknown_tracks(),
            alerts: report.alerts.clone(),
        }
    }
}

/// Payload of `GET /status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusModel {
    pub status: String,
    pub last_frame: Option<FrameSummary>,
    pub metrics: MetricsSnapshot,
}

/// Body of `POST /rescue` and `POST /acknowledge`; no id means everyone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetRequest {
    #[serde(default)]
    pub id: Option<u32>,
}
