use crate::interface::ZoneConfig;
use crate::math::geometry::polygon_contains;
use crate::prelude::{MonitorError, MonitorResult, Point, ZoneKind};
use crate::telemetry::LogManager;

/// Labelled polygon; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    kind: ZoneKind,
    vertices: Vec<Point>,
}

impl Zone {
    pub fn new(kind: ZoneKind, vertices: Vec<Point>) -> MonitorResult<Self> {
        if kind == ZoneKind::Outside {
            return Err(MonitorError::InvalidZone(
                "only pool and safe zones can be drawn".into(),
            ));
        }
        if vertices.len() < 3 {
            return Err(MonitorError::InvalidZone(format!(
                "{:?} polygon needs at least 3 points, got {}",
                kind,
                vertices.len()
            )));
        }
        if vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(MonitorError::InvalidZone(format!(
                "{:?} polygon has non-finite coordinates",
                kind
            )));
        }
        Ok(Self { kind, vertices })
    }

    pub fn from_pairs(kind: ZoneKind, pairs: &[[f64; 2]]) -> MonitorResult<Self> {
        Self::new(kind, pairs.iter().copied().map(Point::from).collect())
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn contains(&self, point: Point) -> bool {
        polygon_contains(&self.vertices, point)
    }

    fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.vertices.iter().map(|p| [p.x, p.y]).collect()
    }
}

/// The configured pool and safe polygons, swapped as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneSet {
    pub pool: Option<Zone>,
    pub safe: Option<Zone>,
}

impl ZoneSet {
    pub fn new(pool: Option<Zone>, safe: Option<Zone>) -> Self {
        Self { pool, safe }
    }

    /// Builds the set from a persisted document. Invalid polygons are
    /// dropped with a warning and behave as "not configured".
    pub fn from_config(config: &ZoneConfig) -> Self {
        let logger = LogManager::new("zones");
        let build = |kind: ZoneKind, pairs: &Option<Vec<[f64; 2]>>| {
            pairs
                .as_ref()
                .and_then(|pairs| match Zone::from_pairs(kind, pairs) {
                    Ok(zone) => Some(zone),
                    Err(err) => {
                        logger.warn(&format!("ignoring zone: {}", err));
                        None
                    }
                })
        };
        Self {
            pool: build(ZoneKind::Pool, &config.pool_zone),
            safe: build(ZoneKind::Safe, &config.safe_zone),
        }
    }

    pub fn to_config(&self) -> ZoneConfig {
        ZoneConfig {
            pool_zone: self.pool.as_ref().map(Zone::to_pairs),
            safe_zone: self.safe.as_ref().map(Zone::to_pairs),
        }
    }
}

/// Resolves positions to exactly one zone label.
#[derive(Debug, Clone, Default)]
pub struct ZoneClassifier {
    zones: ZoneSet,
}

impl ZoneClassifier {
    pub fn new(zones: ZoneSet) -> Self {
        Self { zones }
    }

    /// Safe wins overlaps; a missing pool polygon makes the whole frame pool.
    pub fn classify(&self, point: Point) -> ZoneKind {
        if let Some(safe) = &self.zones.safe {
            if safe.contains(point) {
                return ZoneKind::Safe;
            }
        }
        match &self.zones.pool {
            Some(pool) if pool.contains(point) => ZoneKind::Pool,
            Some(_) => ZoneKind::Outside,
            None => ZoneKind::Pool,
        }
    }

    pub fn reconfigure(&mut self, zones: ZoneSet) {
        self.zones = zones;
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }
}
