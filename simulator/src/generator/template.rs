use anyhow::Context;
use ndarray::Array3;
use poolwatchcore::interface::{DetectionFrame, Frame, ZoneConfig};

const DECK: [u8; 3] = [176, 170, 160];
const SAFE: [u8; 3] = [120, 180, 120];
const WATER: [u8; 3] = [30, 110, 190];
const SWIMMER: [u8; 3] = [240, 150, 60];

fn bounds(polygon: &Option<Vec<[f64; 2]>>) -> Option<[usize; 4]> {
    let points = polygon.as_ref()?;
    let clamp = |v: f64| v.max(0.0) as usize;
    let xs = points.iter().map(|p| p[0]);
    let ys = points.iter().map(|p| p[1]);
    Some([
        clamp(xs.clone().fold(f64::INFINITY, f64::min)),
        clamp(ys.clone().fold(f64::INFINITY, f64::min)),
        clamp(xs.fold(f64::NEG_INFINITY, f64::max)),
        clamp(ys.fold(f64::NEG_INFINITY, f64::max)),
    ])
}

/// Paints a stand-in camera image: deck, rippling water and swimmer boxes.
pub fn render_frame(
    width: usize,
    height: usize,
    zones: &ZoneConfig,
    detections: &DetectionFrame,
) -> anyhow::Result<Frame> {
    let water = bounds(&zones.pool_zone).unwrap_or([0, 0, width, height]);
    let ripple = (detections.timestamp * 12.0) as usize;
    let pixels = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        let inside = x >= water[0] && x < water[2] && y >= water[1] && y < water[3];
        if inside {
            let wave = ((x + 2 * y + ripple) % 24) as u8;
            WATER[c].saturating_add(wave)
        } else {
            DECK[c]
        }
    });
    let mut frame = Frame::from_array(pixels).context("building synthetic frame")?;

    if let Some([x0, y0, x1, y1]) = bounds(&zones.safe_zone) {
        frame.fill_rect(x0, y0, x1, y1, SAFE);
    }
    for detection in &detections.detections {
        let b = detection.bbox;
        frame.fill_rect(
            b.x1.max(0.0) as usize,
            b.y1.max(0.0) as usize,
            b.x2.max(0.0) as usize,
            b.y2.max(0.0) as usize,
            SWIMMER,
        );
    }
    Ok(frame)
}
