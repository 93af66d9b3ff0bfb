use crate::prelude::MonitorResult;
use serde::{Deserialize, Serialize};

/// Persisted zone document: `{"pool_zone": [[x, y], ...] | null, "safe_zone": ...}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub pool_zone: Option<Vec<[f64; 2]>>,
    pub safe_zone: Option<Vec<[f64; 2]>>,
}

impl ZoneConfig {
    pub fn from_json(contents: &str) -> MonitorResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json_pretty(&self) -> MonitorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.pool_zone.is_none() && self.safe_zone.is_none()
    }
}
