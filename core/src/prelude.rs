use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector-local track identifier; carries no guarantee across frames.
pub type TrackId = u64;

/// Stable identity shown to operators as `ID<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID{}", self.0)
    }
}

/// Image-space position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// Zone label a position resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Pool,
    Safe,
    Outside,
}

/// Common error type for the monitoring core.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("invalid zone: {0}")]
    InvalidZone(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("zone document: {0}")]
    ZoneDocument(#[from] serde_json::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
