use anyhow::{ensure, Context};
use poolwatchcore::interface::{Detection, DetectionFrame, ZoneConfig};
use poolwatchcore::Point;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Synthetic swimming session fed to the core in offline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub width: usize,
    pub height: usize,
    pub fps: f64,
    pub duration_sec: f64,
    pub swimmers: usize,
    pub seed: u64,
    /// Swimmer 0 stops being detected at this time.
    pub submerge_at: Option<f64>,
    /// Swimmer 0 surfaces again, under a fresh track id, this long after going under.
    pub resurface_after: Option<f64>,
    /// Detector re-numbers every visible track at this interval.
    pub churn_every: Option<f64>,
    /// The last swimmer climbs out onto the deck early in the session.
    pub walker_to_deck: bool,
    pub noise_px: f64,
    pub description: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            fps: 5.0,
            duration_sec: 60.0,
            swimmers: 3,
            seed: 0,
            submerge_at: Some(5.0),
            resurface_after: None,
            churn_every: None,
            walker_to_deck: true,
            noise_px: 1.5,
            description: None,
        }
    }
}

/// Pixel rectangles of the water and the deck for a frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolLayout {
    pub pool: [f64; 4],
    pub deck: [f64; 4],
}

impl PoolLayout {
    pub fn for_frame(width: usize, height: usize) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            pool: [0.05 * w, 0.1 * h, 0.72 * w, 0.9 * h],
            deck: [0.78 * w, 0.1 * h, 0.97 * w, 0.9 * h],
        }
    }

    fn deck_center(&self) -> Point {
        Point::new(
            (self.deck[0] + self.deck[2]) / 2.0,
            (self.deck[1] + self.deck[3]) / 2.0,
        )
    }
}

fn rect_polygon(rect: [f64; 4]) -> Vec<[f64; 2]> {
    let [x0, y0, x1, y1] = rect;
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
}

/// Zone document matching the rendered scene.
pub fn default_zones(config: &ScenarioConfig) -> ZoneConfig {
    let layout = PoolLayout::for_frame(config.width, config.height);
    ZoneConfig {
        pool_zone: Some(rect_polygon(layout.pool)),
        safe_zone: Some(rect_polygon(layout.deck)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role {
    Diver,
    Walker,
    Drifter,
}

#[derive(Debug)]
struct Swimmer {
    role: Role,
    position: Point,
    velocity: (f64, f64),
    track_id: u64,
    surfaced: bool,
}

const WALK_START_SEC: f64 = 2.0;
const WALK_DURATION_SEC: f64 = 8.0;

/// Builds the per-frame detector output of the scenario.
pub fn build_scenario(config: &ScenarioConfig) -> anyhow::Result<Vec<DetectionFrame>> {
    ensure!(config.fps > 0.0, "scenario fps must be positive");
    ensure!(
        config.width >= 32 && config.height >= 32,
        "scenario frame must be at least 32x32"
    );
    let total = frame_count(config)?;
    let layout = PoolLayout::for_frame(config.width, config.height);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let [px0, py0, px1, py1] = layout.pool;

    let mut next_track: u64 = 1;
    let mut swimmers: Vec<Swimmer> = (0..config.swimmers)
        .map(|index| {
            let role = if index == 0 && config.submerge_at.is_some() {
                Role::Diver
            } else if config.walker_to_deck && config.swimmers > 1 && index + 1 == config.swimmers {
                Role::Walker
            } else {
                Role::Drifter
            };
            let track_id = next_track;
            next_track += 1;
            Swimmer {
                role,
                position: Point::new(
                    rng.gen_range(px0 + 10.0..px1 - 10.0),
                    rng.gen_range(py0 + 10.0..py1 - 10.0),
                ),
                velocity: (rng.gen_range(-12.0..12.0), rng.gen_range(-8.0..8.0)),
                track_id,
                surfaced: true,
            }
        })
        .collect();

    let dt = 1.0 / config.fps;
    let mut frames = Vec::with_capacity(total);
    let mut last_churn = 0.0;

    for index in 0..total {
        let t = index as f64 * dt;

        if let Some(every) = config.churn_every.filter(|e| *e > 0.0) {
            if t - last_churn >= every {
                last_churn = t;
                for swimmer in swimmers.iter_mut() {
                    swimmer.track_id = next_track;
                    next_track += 1;
                }
            }
        }

        let mut detections = Vec::new();
        for swimmer in swimmers.iter_mut() {
            match swimmer.role {
                Role::Walker if t >= WALK_START_SEC => {
                    let progress = ((t - WALK_START_SEC) / WALK_DURATION_SEC).min(1.0);
                    let target = layout.deck_center();
                    swimmer.position = Point::new(
                        swimmer.position.x + (target.x - swimmer.position.x) * progress,
                        swimmer.position.y + (target.y - swimmer.position.y) * progress,
                    );
                }
                Role::Diver => {
                    let submerge_at = config.submerge_at.unwrap_or(f64::INFINITY);
                    let resurface_at = config
                        .resurface_after
                        .map_or(f64::INFINITY, |after| submerge_at + after);
                    let under = t >= submerge_at && t < resurface_at;
                    if under {
                        swimmer.surfaced = false;
                        continue;
                    }
                    if !swimmer.surfaced {
                        swimmer.surfaced = true;
                        swimmer.track_id = next_track;
                        next_track += 1;
                        swimmer.position.x = (swimmer.position.x + 25.0).min(px1 - 5.0);
                    }
                    drift(swimmer, dt, layout.pool);
                }
                _ => drift(swimmer, dt, layout.pool),
            }

            let jitter = config.noise_px.max(0.0);
            let center = Point::new(
                swimmer.position.x + rng.gen_range(-jitter..=jitter),
                swimmer.position.y + rng.gen_range(-jitter..=jitter),
            );
            detections.push(Detection::person(
                swimmer.track_id,
                center,
                rng.gen_range(0.6..0.95),
            ));
        }
        frames.push(DetectionFrame::new(t, detections));
    }

    Ok(frames)
}

fn drift(swimmer: &mut Swimmer, dt: f64, bounds: [f64; 4]) {
    let [x0, y0, x1, y1] = bounds;
    swimmer.position.x += swimmer.velocity.0 * dt;
    swimmer.position.y += swimmer.velocity.1 * dt;
    if swimmer.position.x < x0 + 5.0 || swimmer.position.x > x1 - 5.0 {
        swimmer.velocity.0 = -swimmer.velocity.0;
        swimmer.position.x = swimmer.position.x.clamp(x0 + 5.0, x1 - 5.0);
    }
    if swimmer.position.y < y0 + 5.0 || swimmer.position.y > y1 - 5.0 {
        swimmer.velocity.1 = -swimmer.velocity.1;
        swimmer.position.y = swimmer.position.y.clamp(y0 + 5.0, y1 - 5.0);
    }
}

/// Number of frames the scenario spans.
pub fn frame_count(config: &ScenarioConfig) -> anyhow::Result<usize> {
    let count = (config.duration_sec * config.fps).ceil();
    ensure!(count.is_finite() && count >= 0.0, "scenario duration is invalid");
    usize::try_from(count as u64).context("scenario too long")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_has_expected_frames_and_diver_disappears() {
        let config = ScenarioConfig {
            duration_sec: 10.0,
            ..Default::default()
        };
        let frames = build_scenario(&config).unwrap();
        assert_eq!(frames.len(), frame_count(&config).unwrap());
        assert_eq!(frames.len(), 50);
        assert_eq!(frames[0].detections.len(), 3);
        assert_eq!(frames.last().unwrap().detections.len(), 2);
    }

    #[test]
    fn resurfacing_diver_gets_a_new_track() {
        let config = ScenarioConfig {
            duration_sec: 12.0,
            submerge_at: Some(2.0),
            resurface_after: Some(5.0),
            walker_to_deck: false,
            swimmers: 1,
            ..Default::default()
        };
        let frames = build_scenario(&config).unwrap();
        let before = frames[0].detections[0].track_id;
        let after = frames.last().unwrap().detections[0].track_id;
        assert_ne!(before, after);
        assert!(frames.iter().any(|f| f.detections.is_empty()));
    }

    #[test]
    fn same_seed_same_scenario() {
        let config = ScenarioConfig {
            duration_sec: 3.0,
            churn_every: Some(1.0),
            ..Default::default()
        };
        assert_eq!(build_scenario(&config).unwrap(), build_scenario(&config).unwrap());
    }

    #[test]
    fn walker_ends_on_the_deck() {
        let config = ScenarioConfig {
            duration_sec: 15.0,
            submerge_at: None,
            swimmers: 2,
            ..Default::default()
        };
        let layout = PoolLayout::for_frame(config.width, config.height);
        let frames = build_scenario(&config).unwrap();
        let walker = frames.last().unwrap().detections[1].bbox.center();
        assert!(walker.x > layout.deck[0] && walker.x < layout.deck[2]);
    }

    #[test]
    fn zero_fps_is_rejected() {
        let config = ScenarioConfig {
            fps: 0.0,
            ..Default::default()
        };
        assert!(build_scenario(&config).is_err());
    }
}
