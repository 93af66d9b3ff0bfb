use crate::generator::profile::build_scenario;
use crate::generator::template::render_frame;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use poolwatchcore::interface::{NotificationTransport, ZoneConfig};
use poolwatchcore::telemetry::MetricsSnapshot;
use poolwatchcore::WatchSession;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowResult {
    pub frames: usize,
    pub alerts_requested: usize,
    pub alerts_dispatched: usize,
    pub max_total_seen: usize,
    pub max_pool_seen: usize,
    pub reidentifications: usize,
    pub unknown_tracks: usize,
    pub missing_in_pool: usize,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Plays the configured scenario through `session` frame by frame.
    pub fn execute<T: NotificationTransport>(
        &self,
        session: &mut WatchSession<T>,
        zones: &ZoneConfig,
    ) -> anyhow::Result<WorkflowResult> {
        let scenario = &self.config.scenario;
        let frames = build_scenario(scenario).context("building scenario")?;
        if let Some(description) = &scenario.description {
            info!("scenario: {} ({} frames)", description, frames.len());
        }

        let mut result = WorkflowResult::default();
        for detections in &frames {
            let frame = render_frame(scenario.width, scenario.height, zones, detections)
                .with_context(|| format!("rendering frame at {:.2}s", detections.timestamp))?;
            let report = session
                .ingest(detections, Arc::new(frame))
                .with_context(|| format!("ingesting frame at {:.2}s", detections.timestamp))?;

            result.frames += 1;
            result.alerts_requested += report.alerts.len();
            result.alerts_dispatched += report.alerts_dispatched;
            result.reidentifications += report.reidentified();
            result.unknown_tracks += report.unknown_tracks();
            result.max_total_seen = report.occupancy.max_total_seen;
            result.max_pool_seen = report.occupancy.max_pool_seen;
            result.missing_in_pool = report.missing_in_pool;
        }
        result.metrics = session.metrics();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{default_zones, ScenarioConfig};
    use crate::transport::console::ConsoleTransport;
    use poolwatchcore::tracking::ZoneSet;
    use tokio::runtime::Handle;

    fn workflow(dir: &tempfile::TempDir, scenario: ScenarioConfig) -> WorkflowConfig {
        let mut cfg = WorkflowConfig {
            scenario,
            ..WorkflowConfig::default()
        };
        cfg.dispatch.output_dir = dir.path().to_path_buf();
        cfg.dispatch.video_fps = 5.0;
        cfg.dispatch.video_duration_sec = 1.0;
        cfg
    }

    fn session(cfg: &WorkflowConfig, zones: &ZoneConfig) -> WatchSession<ConsoleTransport> {
        WatchSession::new(
            cfg.monitor.clone(),
            cfg.dispatch.clone(),
            ZoneSet::from_config(zones),
            Arc::new(ConsoleTransport),
            &Handle::current(),
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runner_reports_missing_diver() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workflow(
            &dir,
            ScenarioConfig {
                duration_sec: 50.0,
                ..ScenarioConfig::default()
            },
        );
        let zones = default_zones(&cfg.scenario);
        let mut session = session(&cfg, &zones);

        let result = Runner::new(cfg.clone()).execute(&mut session, &zones).unwrap();
        assert_eq!(result.frames, 250);
        assert_eq!(result.max_total_seen, 3);
        assert_eq!(result.alerts_requested, 5);
        assert_eq!(result.missing_in_pool, 1);
        assert_eq!(result.metrics.frames_ingested, 250);
        session.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resurfacing_diver_is_reidentified_without_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = workflow(
            &dir,
            ScenarioConfig {
                duration_sec: 20.0,
                resurface_after: Some(6.0),
                ..ScenarioConfig::default()
            },
        );
        let zones = default_zones(&cfg.scenario);
        let mut session = session(&cfg, &zones);

        let result = Runner::new(cfg.clone()).execute(&mut session, &zones).unwrap();
        assert_eq!(result.reidentifications, 1);
        assert_eq!(result.alerts_requested, 0);
        assert_eq!(result.unknown_tracks, 0);
        session.shutdown().await;
    }
}
