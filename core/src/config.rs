use crate::prelude::{DisplayId, MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rung of the missing-swimmer escalation ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTier {
    pub seconds: f64,
    pub level: u8,
    /// Caption template; `{id}` and `{seconds}` are substituted.
    pub message: String,
}

impl AlertTier {
    pub fn new(seconds: f64, level: u8, message: &str) -> Self {
        Self {
            seconds,
            level,
            message: message.to_string(),
        }
    }
}

/// Substitutes `{id}` and `{seconds}` in an alert template.
pub fn render_caption(template: &str, id: DisplayId, elapsed: f64) -> String {
    template
        .replace("{id}", &id.to_string())
        .replace("{seconds}", &format!("{}", elapsed.max(0.0) as u64))
}

fn default_tiers() -> Vec<AlertTier> {
    vec![
        AlertTier::new(20.0, 1, "{id} has been underwater for 20 seconds"),
        AlertTier::new(25.0, 2, "{id} has been underwater for 25 seconds"),
        AlertTier::new(
            30.0,
            3,
            "{id} may be drowning: 30 seconds underwater, check now",
        ),
        AlertTier::new(
            35.0,
            4,
            "{id} may be drowning: 35 seconds underwater, check urgently",
        ),
        AlertTier::new(
            40.0,
            5,
            "{id} at high drowning risk: 40 seconds underwater, respond immediately",
        ),
    ]
}

/// Tunables for identity resolution and missing-swimmer escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub confidence_threshold: f32,
    pub person_class_id: u32,
    pub missing_alert_sec: f64,
    pub repeat_alert_interval_sec: f64,
    pub reidentify_distance_px: f64,
    pub reidentify_time_sec: f64,
    /// Absence after which a pool identity becomes a re-identification candidate.
    pub submerge_grace_sec: f64,
    pub repeat_message: String,
    pub tiers: Vec<AlertTier>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            person_class_id: 0,
            missing_alert_sec: 40.0,
            repeat_alert_interval_sec: 10.0,
            reidentify_distance_px: 150.0,
            reidentify_time_sec: 60.0,
            submerge_grace_sec: 1.0,
            repeat_message:
                "{id} missing for more than {seconds} seconds! Confirm the rescue to stop alerts"
                    .to_string(),
            tiers: default_tiers(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        let durations = [
            ("missing_alert_sec", self.missing_alert_sec),
            ("repeat_alert_interval_sec", self.repeat_alert_interval_sec),
            ("reidentify_distance_px", self.reidentify_distance_px),
            ("reidentify_time_sec", self.reidentify_time_sec),
            ("submerge_grace_sec", self.submerge_grace_sec),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.tiers.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "at least one alert tier is required".into(),
            ));
        }
        for pair in self.tiers.windows(2) {
            if pair[1].seconds < pair[0].seconds || pair[1].level <= pair[0].level {
                return Err(MonitorError::InvalidConfig(format!(
                    "alert tiers must ascend: level {} at {}s follows level {} at {}s",
                    pair[1].level, pair[1].seconds, pair[0].level, pair[0].seconds
                )));
            }
        }
        if self.tiers[0].level == 0 {
            return Err(MonitorError::InvalidConfig(
                "tier level 0 is reserved for visible swimmers".into(),
            ));
        }
        Ok(())
    }

    /// Highest tier; repeat alerts start once it has fired.
    pub fn top_tier(&self) -> Option<&AlertTier> {
        self.tiers.last()
    }
}

/// Tunables for the alert gate, clip assembly and delivery workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub alert_cooldown_sec: f64,
    pub alert_text: String,
    pub send_message: bool,
    pub send_photo: bool,
    pub send_video: bool,
    pub video_duration_sec: f64,
    pub video_fps: f64,
    pub video_buffer_len: usize,
    pub output_dir: PathBuf,
    pub queue_capacity: usize,
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            alert_cooldown_sec: 0.0,
            alert_text: "Possible drowning detected".to_string(),
            send_message: true,
            send_photo: true,
            send_video: true,
            video_duration_sec: 3.0,
            video_fps: 30.0,
            video_buffer_len: 100,
            output_dir: PathBuf::from("alerts"),
            queue_capacity: 32,
            workers: 2,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if !self.alert_cooldown_sec.is_finite() || self.alert_cooldown_sec < 0.0 {
            return Err(MonitorError::InvalidConfig(
                "alert_cooldown_sec must be a non-negative number".into(),
            ));
        }
        if !(self.video_fps.is_finite() && self.video_fps > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "video_fps must be positive".into(),
            ));
        }
        if !(self.video_duration_sec.is_finite() && self.video_duration_sec > 0.0) {
            return Err(MonitorError::InvalidConfig(
                "video_duration_sec must be positive".into(),
            ));
        }
        if self.video_buffer_len == 0 || self.queue_capacity == 0 || self.workers == 0 {
            return Err(MonitorError::InvalidConfig(
                "video_buffer_len, queue_capacity and workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
