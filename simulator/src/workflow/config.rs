use crate::generator::profile::ScenarioConfig;
use anyhow::Context;
use log::warn;
use poolwatchcore::{DispatchConfig, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub monitor: MonitorConfig,
    pub dispatch: DispatchConfig,
    pub scenario: ScenarioConfig,
    pub zones_path: PathBuf,
    pub bind: SocketAddr,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            dispatch: DispatchConfig::default(),
            scenario: ScenarioConfig::default(),
            zones_path: PathBuf::from("zones.json"),
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
    applied: &mut Vec<String>,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => {
                *target = value;
                applied.push(key.to_string());
            }
            Err(_) => warn!("ignoring {}={:?}: not a valid value", key, raw),
        }
    }
}

fn override_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut bool,
    applied: &mut Vec<String>,
) {
    if let Some(raw) = lookup(key) {
        match parse_flag(&raw) {
            Some(value) => {
                *target = value;
                applied.push(key.to_string());
            }
            None => warn!("ignoring {}={:?}: expected a boolean", key, raw),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies the process environment on top of the loaded values.
    pub fn apply_env(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `KEY=value` overrides; unparsable values keep the current setting.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut applied = Vec::new();
        let monitor = &mut self.monitor;
        let dispatch = &mut self.dispatch;

        override_parsed(&lookup, "DET_CONF", &mut monitor.confidence_threshold, &mut applied);
        override_parsed(&lookup, "MISSING_ALERT_SEC", &mut monitor.missing_alert_sec, &mut applied);
        override_parsed(
            &lookup,
            "REPEAT_ALERT_INTERVAL",
            &mut monitor.repeat_alert_interval_sec,
            &mut applied,
        );
        override_parsed(
            &lookup,
            "REIDENTIFY_DISTANCE_PX",
            &mut monitor.reidentify_distance_px,
            &mut applied,
        );
        override_parsed(
            &lookup,
            "REIDENTIFY_TIME_SEC",
            &mut monitor.reidentify_time_sec,
            &mut applied,
        );
        override_parsed(
            &lookup,
            "ALERT_COOLDOWN_SEC",
            &mut dispatch.alert_cooldown_sec,
            &mut applied,
        );
        override_parsed(
            &lookup,
            "VIDEO_DURATION_SEC",
            &mut dispatch.video_duration_sec,
            &mut applied,
        );
        override_parsed(&lookup, "VIDEO_FPS", &mut dispatch.video_fps, &mut applied);
        override_parsed(&lookup, "VIDEO_BUFFER_LEN", &mut dispatch.video_buffer_len, &mut applied);
        override_parsed(&lookup, "ALERT_OUTPUT_DIR", &mut dispatch.output_dir, &mut applied);
        override_flag(&lookup, "SEND_MESSAGE", &mut dispatch.send_message, &mut applied);
        override_flag(&lookup, "SEND_PHOTO", &mut dispatch.send_photo, &mut applied);
        override_flag(&lookup, "SEND_VIDEO", &mut dispatch.send_video, &mut applied);
        if let Some(text) = lookup("ALERT_TEXT") {
            dispatch.alert_text = text;
            applied.push("ALERT_TEXT".to_string());
        }
        applied
    }

    /// Validates both core configs so the driver fails before any I/O starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.monitor.validate().context("monitor settings")?;
        self.dispatch.validate().context("dispatch settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        let yaml = "monitor:\n  missing_alert_sec: 30\n\
                    dispatch:\n  video_fps: 10\n\
                    scenario:\n  swimmers: 5\n";
        temp.write_all(yaml.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.monitor.missing_alert_sec, 30.0);
        assert_eq!(cfg.dispatch.video_fps, 10.0);
        assert_eq!(cfg.scenario.swimmers, 5);
        assert_eq!(cfg.monitor.reidentify_distance_px, 150.0);
        assert_eq!(cfg.zones_path, PathBuf::from("zones.json"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = WorkflowConfig::load("/nonexistent/poolwatch.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/poolwatch.yaml"));
    }

    #[test]
    fn overrides_apply_and_bad_values_are_skipped() {
        let mut cfg = WorkflowConfig::default();
        let applied = cfg.apply_overrides(lookup_from(&[
            ("DET_CONF", "0.35"),
            ("VIDEO_FPS", "fast"),
            ("SEND_VIDEO", "off"),
            ("SEND_PHOTO", "maybe"),
            ("ALERT_TEXT", "Check lane 3"),
            ("VIDEO_BUFFER_LEN", "250"),
        ]));
        assert_eq!(cfg.monitor.confidence_threshold, 0.35);
        assert_eq!(cfg.dispatch.video_fps, 30.0);
        assert!(!cfg.dispatch.send_video);
        assert!(cfg.dispatch.send_photo);
        assert_eq!(cfg.dispatch.alert_text, "Check lane 3");
        assert_eq!(cfg.dispatch.video_buffer_len, 250);
        assert_eq!(applied.len(), 4);
        cfg.validate().unwrap();
    }
}
