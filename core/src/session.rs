//! One monitored camera: tracking state, recent frames and alert delivery.

use crate::alerting::{AlertDispatcher, AlertJob, FrameRingBuffer};
use crate::config::{DispatchConfig, MonitorConfig};
use crate::interface::{DetectionFrame, Frame, NotificationTransport, TimedFrame};
use crate::prelude::{DisplayId, MonitorResult};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use crate::tracking::{FrameReport, RescueTarget, Tracker, ZoneSet};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct WatchSession<T: NotificationTransport> {
    tracker: Tracker,
    ring: FrameRingBuffer,
    dispatcher: AlertDispatcher<T>,
    alert_text: String,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<T: NotificationTransport> WatchSession<T> {
    pub fn new(
        monitor: MonitorConfig,
        dispatch: DispatchConfig,
        zones: ZoneSet,
        transport: Arc<T>,
        runtime: &Handle,
    ) -> MonitorResult<Self> {
        let metrics = Arc::new(MetricsRecorder::new());
        let tracker = Tracker::new(monitor, zones)?;
        let ring = FrameRingBuffer::with_capacity(dispatch.video_buffer_len);
        let alert_text = dispatch.alert_text.clone();
        let dispatcher = AlertDispatcher::new(dispatch, transport, runtime, Arc::clone(&metrics))?;
        Ok(Self {
            tracker,
            ring,
            dispatcher,
            alert_text,
            metrics,
            logger: LogManager::new("session"),
        })
    }

    /// Runs one frame through tracking and alerting.
    ///
    /// Alerts see only earlier frames as pre-event context; the current frame
    /// becomes the first live frame of any recording it starts.
    pub fn ingest(
        &mut self,
        detections: &DetectionFrame,
        frame: Arc<Frame>,
    ) -> MonitorResult<FrameReport> {
        let mut report = self.tracker.process(detections)?;
        let now = detections.timestamp;
        self.metrics.record_frame();

        if !report.alerts.is_empty() {
            let pre_buffer = self.ring.snapshot();
            for alert in &report.alerts {
                let job = AlertJob {
                    trigger_frame: TimedFrame::new(now, Arc::clone(&frame)),
                    pre_buffer: pre_buffer.clone(),
                    caption: self.caption_for(&alert.caption),
                };
                if self.dispatcher.trigger(job, now) {
                    report.alerts_dispatched += 1;
                }
            }
        }

        self.dispatcher.push_frame(Arc::clone(&frame), now);
        self.ring.push(now, frame);
        Ok(report)
    }

    fn caption_for(&self, message: &str) -> String {
        if self.alert_text.is_empty() {
            message.to_string()
        } else {
            format!("{}: {}", self.alert_text, message)
        }
    }

    /// Retires alerting identities and confirms the rescue to operators.
    pub fn rescue(&mut self, target: RescueTarget) -> Vec<DisplayId> {
        let rescued = self.tracker.rescue(target);
        if rescued.is_empty() {
            self.logger.detail(&format!("rescue {:?}: nothing to clear", target));
            return rescued;
        }
        let names: Vec<String> = rescued.iter().map(ToString::to_string).collect();
        self.dispatcher
            .notify_text(&format!("Rescue confirmed for {}. Alerts stopped.", names.join(", ")));
        rescued
    }

    pub fn acknowledge(&mut self, id: DisplayId) -> bool {
        self.tracker.acknowledge(id)
    }

    pub fn reconfigure_zones(&mut self, zones: ZoneSet) {
        self.tracker.reconfigure_zones(zones);
    }

    /// Operator text outside the alert gate (startup, shutdown).
    pub fn announce(&self, text: &str) -> bool {
        self.dispatcher.notify_text(text)
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &AlertDispatcher<T> {
        &self.dispatcher
    }

    pub fn ring(&self) -> &FrameRingBuffer {
        &self.ring
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn close(&mut self) -> Option<JoinHandle<()>> {
        self.dispatcher.close()
    }

    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}
