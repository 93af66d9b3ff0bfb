use crate::alerting::clip::{select_pre_event_frames, ClipPlan};
use crate::alerting::media::{write_clip, write_snapshot, DeliveryError, DeliveryResult};
use crate::alerting::ring_buffer::RingBufferEntry;
use crate::alerting::stamp::stamp_capture_time;
use crate::config::DispatchConfig;
use crate::interface::{Frame, NotificationTransport, TimedFrame};
use crate::prelude::MonitorResult;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Everything the dispatcher needs to act on one alert.
#[derive(Debug, Clone)]
pub struct AlertJob {
    /// Frame shown in the snapshot photo.
    pub trigger_frame: TimedFrame,
    /// Frames captured before the trigger, oldest first.
    pub pre_buffer: Vec<RingBufferEntry>,
    pub caption: String,
}

#[derive(Debug)]
enum DeliveryTask {
    Text(String),
    Notify {
        caption: String,
        snapshot: Option<(Arc<Frame>, PathBuf)>,
        send_text: bool,
    },
    Clip {
        frames: Vec<TimedFrame>,
        path: PathBuf,
        caption: String,
    },
}

impl DeliveryTask {
    fn label(&self) -> &'static str {
        match self {
            DeliveryTask::Text(_) => "text",
            DeliveryTask::Notify { .. } => "notification",
            DeliveryTask::Clip { .. } => "clip",
        }
    }
}

#[derive(Debug)]
struct Recording {
    frames: Vec<TimedFrame>,
    remaining: usize,
    caption: String,
    path: PathBuf,
}

#[derive(Debug, Default)]
struct Gate {
    last_accepted: Option<f64>,
    recording: Option<Recording>,
    sequence: u64,
}

/// Cooldown-gated alert intake with a bounded pool of delivery workers.
///
/// `trigger` and `push_frame` only touch an in-memory gate and a bounded
/// queue, so the ingestion loop never waits on encoding or the network.
pub struct AlertDispatcher<T: NotificationTransport> {
    config: DispatchConfig,
    plan: ClipPlan,
    gate: Mutex<Gate>,
    queue: Option<mpsc::Sender<DeliveryTask>>,
    worker: Option<JoinHandle<()>>,
    transport: Arc<T>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<T: NotificationTransport> AlertDispatcher<T> {
    /// Starts the delivery loop on `runtime`.
    pub fn new(
        config: DispatchConfig,
        transport: Arc<T>,
        runtime: &Handle,
        metrics: Arc<MetricsRecorder>,
    ) -> MonitorResult<Self> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let worker = runtime.spawn(run_deliveries(
            receiver,
            Arc::clone(&transport),
            config.workers,
            config.video_fps,
            Arc::clone(&metrics),
        ));
        let logger = LogManager::new("dispatcher");
        logger.record(&format!(
            "delivering through {} with {} worker(s)",
            transport.name(),
            config.workers
        ));
        Ok(Self {
            plan: ClipPlan::from_config(&config),
            config,
            gate: Mutex::new(Gate::default()),
            queue: Some(sender),
            worker: Some(worker),
            transport,
            metrics,
            logger,
        })
    }

    /// Accepts an alert unless the cooldown or an active recording blocks it.
    pub fn trigger(&self, job: AlertJob, now: f64) -> bool {
        let Ok(mut gate) = self.gate.lock() else {
            self.logger.error("alert gate poisoned, dropping alert");
            return false;
        };

        if let Some(last) = gate.last_accepted {
            if now - last < self.config.alert_cooldown_sec {
                self.logger.detail(&format!(
                    "alert suppressed: cooldown ({:.1}s since last)",
                    now - last
                ));
                self.metrics.record_rejected();
                return false;
            }
        }
        if gate.recording.is_some() {
            self.logger
                .detail("alert suppressed: a clip is still recording");
            self.metrics.record_rejected();
            return false;
        }

        let sequence = gate.sequence + 1;
        let stem = format!("alert_{:05}_{}ms", sequence, (now * 1000.0).round() as i64);

        if self.config.send_message || self.config.send_photo {
            let snapshot = self.config.send_photo.then(|| {
                (
                    Arc::clone(&job.trigger_frame.frame),
                    self.config.output_dir.join(format!("{}.jpg", stem)),
                )
            });
            let task = DeliveryTask::Notify {
                caption: job.caption.clone(),
                snapshot,
                send_text: self.config.send_message,
            };
            if !self.enqueue(task) {
                self.metrics.record_rejected();
                return false;
            }
        }

        if self.config.send_video {
            let pre_frames = select_pre_event_frames(
                &job.pre_buffer,
                now,
                self.config.video_duration_sec,
                self.plan,
            );
            let remaining = self.plan.total_frames - pre_frames.len();
            self.logger.detail(&format!(
                "recording {}: {} pre-event frame(s), {} to go",
                stem,
                pre_frames.len(),
                remaining
            ));
            gate.recording = Some(Recording {
                frames: pre_frames,
                remaining,
                caption: job.caption.clone(),
                path: self.config.output_dir.join(format!("{}.gif", stem)),
            });
        }

        gate.sequence = sequence;
        gate.last_accepted = Some(now);
        self.metrics.record_accepted();
        self.logger.record(&format!("alert accepted: {}", job.caption));
        true
    }

    /// Appends a copy of a live frame, stamped with `now`, to the active
    /// recording; returns whether it was used.
    pub fn push_frame(&self, frame: Arc<Frame>, now: f64) -> bool {
        if !self.is_recording() {
            return false;
        }
        // Stamped outside the lock; only the ingestion loop pushes frames.
        let stamped = Arc::new(stamp_capture_time(&frame, now));
        let Ok(mut gate) = self.gate.lock() else {
            return false;
        };
        let Some(recording) = gate.recording.as_mut() else {
            return false;
        };
        recording.frames.push(TimedFrame::new(now, stamped));
        recording.remaining = recording.remaining.saturating_sub(1);
        let finished = if recording.remaining == 0 {
            gate.recording.take()
        } else {
            None
        };
        drop(gate);
        if let Some(finished) = finished {
            self.finish_recording(finished);
        }
        true
    }

    fn finish_recording(&self, recording: Recording) {
        self.logger.detail(&format!(
            "recording complete with {} frame(s)",
            recording.frames.len()
        ));
        let task = DeliveryTask::Clip {
            frames: recording.frames,
            path: recording.path,
            caption: recording.caption,
        };
        if !self.enqueue(task) {
            self.metrics.record_failed();
        }
    }

    /// Ungated operator message.
    pub fn notify_text(&self, text: &str) -> bool {
        self.enqueue(DeliveryTask::Text(text.to_string()))
    }

    fn enqueue(&self, task: DeliveryTask) -> bool {
        let Some(queue) = &self.queue else {
            self.logger
                .warn(&format!("{} dropped: dispatcher closed", task.label()));
            return false;
        };
        match queue.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                self.logger
                    .warn(&format!("{} dropped: delivery queue full", task.label()));
                false
            }
            Err(TrySendError::Closed(task)) => {
                self.logger
                    .error(&format!("{} dropped: delivery loop stopped", task.label()));
                false
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.gate
            .lock()
            .map(|gate| gate.recording.is_some())
            .unwrap_or(false)
    }

    pub fn frames_remaining(&self) -> Option<usize> {
        self.gate
            .lock()
            .ok()
            .and_then(|gate| gate.recording.as_ref().map(|r| r.remaining))
    }

    pub fn plan(&self) -> ClipPlan {
        self.plan
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Stops intake. A clip still recording is sent with the frames it has.
    /// The returned handle resolves once in-flight deliveries finish.
    pub fn close(&mut self) -> Option<JoinHandle<()>> {
        let partial = self
            .gate
            .lock()
            .ok()
            .and_then(|mut gate| gate.recording.take());
        if let Some(recording) = partial {
            self.logger.warn(&format!(
                "closing mid-recording, sending {} frame(s)",
                recording.frames.len()
            ));
            if recording.frames.is_empty() {
                self.metrics.record_failed();
            } else {
                self.finish_recording(recording);
            }
        }
        self.queue.take();
        self.worker.take()
    }

    pub async fn shutdown(mut self) {
        if let Some(worker) = self.close() {
            if let Err(err) = worker.await {
                self.logger
                    .error(&format!("delivery loop ended abnormally: {}", err));
            }
        }
    }
}

async fn run_deliveries<T: NotificationTransport>(
    mut receiver: mpsc::Receiver<DeliveryTask>,
    transport: Arc<T>,
    workers: usize,
    fps: f64,
    metrics: Arc<MetricsRecorder>,
) {
    let logger = LogManager::new("delivery");
    let permits = Arc::new(Semaphore::new(workers));
    while let Some(task) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let transport = Arc::clone(&transport);
        let metrics = Arc::clone(&metrics);
        tokio::spawn(async move {
            deliver(task, transport.as_ref(), fps, &metrics).await;
            drop(permit);
        });
    }
    if permits.acquire_many(workers as u32).await.is_ok() {
        logger.detail("all deliveries finished");
    }
}

fn account(
    metrics: &MetricsRecorder,
    logger: &LogManager,
    what: &str,
    result: DeliveryResult<()>,
) {
    match result {
        Ok(()) => metrics.record_delivered(),
        Err(err) => {
            metrics.record_failed();
            logger.warn(&format!("{} failed: {}", what, err));
        }
    }
}

async fn deliver<T: NotificationTransport>(
    task: DeliveryTask,
    transport: &T,
    fps: f64,
    metrics: &MetricsRecorder,
) {
    let logger = LogManager::new("delivery");
    match task {
        DeliveryTask::Text(text) => {
            let result = transport.send_text(&text).await.map_err(DeliveryError::from);
            account(metrics, &logger, "text", result);
        }
        DeliveryTask::Notify {
            caption,
            snapshot,
            send_text,
        } => {
            if send_text {
                let result = transport
                    .send_text(&caption)
                    .await
                    .map_err(DeliveryError::from);
                account(metrics, &logger, "alert text", result);
            }
            if let Some((frame, path)) = snapshot {
                let result = send_snapshot(transport, frame, path, &caption).await;
                account(metrics, &logger, "snapshot", result);
            }
        }
        DeliveryTask::Clip {
            frames,
            path,
            caption,
        } => {
            let result = send_clip(transport, frames, path, fps, &caption).await;
            account(metrics, &logger, "clip", result);
        }
    }
}

async fn send_snapshot<T: NotificationTransport>(
    transport: &T,
    frame: Arc<Frame>,
    path: PathBuf,
    caption: &str,
) -> DeliveryResult<()> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_snapshot(&frame, &target))
        .await
        .map_err(|err| DeliveryError::Aborted(err.to_string()))??;
    transport.send_photo(&path, caption).await?;
    Ok(())
}

async fn send_clip<T: NotificationTransport>(
    transport: &T,
    frames: Vec<TimedFrame>,
    path: PathBuf,
    fps: f64,
    caption: &str,
) -> DeliveryResult<()> {
    let target = path.clone();
    let summary = tokio::task::spawn_blocking(move || write_clip(&frames, fps, &target))
        .await
        .map_err(|err| DeliveryError::Aborted(err.to_string()))??;
    LogManager::new("delivery").record(&format!(
        "sending clip {} ({} frames)",
        summary.path.display(),
        summary.frames
    ));
    transport.send_video(&path, caption).await?;
    Ok(())
}
