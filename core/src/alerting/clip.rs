use crate::alerting::ring_buffer::RingBufferEntry;
use crate::config::DispatchConfig;
use crate::interface::TimedFrame;
use crate::math::linspace_indices;

/// Frame budget of one alert clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipPlan {
    pub total_frames: usize,
    /// Live frames always recorded after the trigger.
    pub min_post_frames: usize,
}

impl ClipPlan {
    pub fn new(duration_sec: f64, fps: f64) -> Self {
        let total_frames = ((duration_sec * fps).round() as usize).max(1);
        let mut min_post_frames = (fps.round() as usize).max(1);
        if min_post_frames >= total_frames {
            min_post_frames = total_frames.saturating_sub(1).max(1);
        }
        Self {
            total_frames,
            min_post_frames,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.video_duration_sec, config.video_fps)
    }

    pub fn max_pre_frames(&self) -> usize {
        self.total_frames.saturating_sub(self.min_post_frames)
    }
}

/// Chooses the pre-event part of a clip from buffered frames.
///
/// Frames within `window_sec` of `now` are eligible; an empty window falls
/// back to the newest buffered frame. The window is thinned to the clip's
/// total frame count by evenly spaced indices, then only the newest
/// `max_pre_frames` are kept so the pre-event part plays at real speed.
/// Never pads.
pub fn select_pre_event_frames(
    buffer: &[RingBufferEntry],
    now: f64,
    window_sec: f64,
    plan: ClipPlan,
) -> Vec<TimedFrame> {
    let quota = plan.max_pre_frames();
    if quota == 0 || buffer.is_empty() {
        return Vec::new();
    }
    let cutoff = now - window_sec;
    let mut window: Vec<&RingBufferEntry> =
        buffer.iter().filter(|e| e.timestamp >= cutoff).collect();
    if window.is_empty() {
        window.extend(buffer.last());
    }

    let picks = linspace_indices(window.len(), plan.total_frames);
    let skip = picks.len().saturating_sub(quota);
    picks
        .into_iter()
        .skip(skip)
        .map(|index| TimedFrame::from(window[index].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Frame;
    use std::sync::Arc;

    fn buffer(stamps: &[f64]) -> Vec<RingBufferEntry> {
        let frame = Arc::new(Frame::filled(1, 1, [0, 0, 0]));
        stamps
            .iter()
            .map(|&timestamp| RingBufferEntry {
                timestamp,
                frame: Arc::clone(&frame),
            })
            .collect()
    }

    #[test]
    fn default_plan_is_ninety_frames_with_one_second_post() {
        let plan = ClipPlan::from_config(&DispatchConfig::default());
        assert_eq!(plan.total_frames, 90);
        assert_eq!(plan.min_post_frames, 30);
        assert_eq!(plan.max_pre_frames(), 60);
    }

    #[test]
    fn short_clips_keep_one_post_frame() {
        let plan = ClipPlan::new(1.0, 2.0);
        assert_eq!(plan.total_frames, 2);
        assert_eq!(plan.min_post_frames, 1);
        assert_eq!(plan.max_pre_frames(), 1);

        let single = ClipPlan::new(0.1, 1.0);
        assert_eq!(single.total_frames, 1);
        assert_eq!(single.min_post_frames, 1);
        assert_eq!(single.max_pre_frames(), 0);
    }

    fn plan(total_frames: usize, min_post_frames: usize) -> ClipPlan {
        ClipPlan {
            total_frames,
            min_post_frames,
        }
    }

    #[test]
    fn window_excludes_stale_frames() {
        let frames =
            select_pre_event_frames(&buffer(&[0.0, 5.0, 6.0, 7.0]), 8.0, 3.0, plan(12, 2));
        let stamps: Vec<f64> = frames.iter().map(|f| f.captured_at).collect();
        assert_eq!(stamps, vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn empty_window_falls_back_to_newest() {
        let frames = select_pre_event_frames(&buffer(&[0.0, 1.0]), 50.0, 3.0, plan(6, 1));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].captured_at, 1.0);
    }

    #[test]
    fn crowded_window_is_thinned_to_clip_rate_then_trimmed() {
        let stamps: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        let frames = select_pre_event_frames(&buffer(&stamps), 1.0, 3.0, plan(6, 2));
        let picked: Vec<f64> = frames.iter().map(|f| f.captured_at).collect();
        assert_eq!(picked, vec![stamps[4], stamps[5], stamps[7], stamps[9]]);
    }

    #[test]
    fn full_buffer_keeps_the_newest_frames_at_real_speed() {
        let stamps: Vec<f64> = (0..90).map(|i| 7.0 + i as f64 / 30.0).collect();
        let default_plan = ClipPlan::from_config(&DispatchConfig::default());
        let frames = select_pre_event_frames(&buffer(&stamps), 10.0, 3.0, default_plan);
        let picked: Vec<f64> = frames.iter().map(|f| f.captured_at).collect();
        assert_eq!(picked, stamps[30..].to_vec());
        assert_eq!(picked[0], 8.0);
    }

    #[test]
    fn zero_quota_selects_nothing() {
        assert!(select_pre_event_frames(&buffer(&[1.0]), 1.0, 3.0, plan(1, 1)).is_empty());
    }
}
