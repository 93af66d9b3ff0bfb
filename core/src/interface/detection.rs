use crate::prelude::{Point, TrackId};
use serde::{Deserialize, Serialize};

/// Axis-aligned detector box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box centred on `center` with the given half extents.
    pub fn around(center: Point, half_width: f64, half_height: f64) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Single detector output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
    #[serde(default)]
    pub class_id: u32,
}

impl Detection {
    pub fn new(
        bbox: BoundingBox,
        confidence: f32,
        track_id: Option<TrackId>,
        class_id: u32,
    ) -> Self {
        Self {
            bbox,
            confidence,
            track_id,
            class_id,
        }
    }

    /// Tracked person detection, the common case in tests and scenarios.
    pub fn person(track_id: TrackId, center: Point, confidence: f32) -> Self {
        Self::new(
            BoundingBox::around(center, 12.0, 20.0),
            confidence,
            Some(track_id),
            0,
        )
    }
}

/// Everything the detector reported for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Capture time in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn new(timestamp: f64, detections: Vec<Detection>) -> Self {
        Self {
            timestamp,
            detections,
        }
    }

    pub fn empty(timestamp: f64) -> Self {
        Self::new(timestamp, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_box_midpoint() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox.center(), Point::new(20.0, 40.0));
    }

    #[test]
    fn detector_json_without_track_id_parses() {
        let frame: DetectionFrame = serde_json::from_str(
            r#"{"timestamp": 1.5, "detections": [
                {"bbox": {"x1": 0, "y1": 0, "x2": 10, "y2": 10}, "confidence": 0.9}
            ]}"#,
        )
        .unwrap();
        assert_eq!(frame.detections.len(), 1);
        assert_eq!(frame.detections[0].track_id, None);
        assert_eq!(frame.detections[0].class_id, 0);
    }
}
