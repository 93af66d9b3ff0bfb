use crate::interface::{Frame, TimedFrame};
use std::collections::VecDeque;
use std::sync::Arc;

/// One buffered camera frame.
#[derive(Debug, Clone)]
pub struct RingBufferEntry {
    pub timestamp: f64,
    pub frame: Arc<Frame>,
}

impl From<RingBufferEntry> for TimedFrame {
    fn from(entry: RingBufferEntry) -> Self {
        TimedFrame::new(entry.timestamp, entry.frame)
    }
}

/// Fixed-capacity FIFO of recent frames feeding the pre-event window.
#[derive(Debug)]
pub struct FrameRingBuffer {
    entries: VecDeque<RingBufferEntry>,
    capacity: usize,
}

impl FrameRingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a frame, returning the evicted oldest entry when full.
    pub fn push(&mut self, timestamp: f64, frame: Arc<Frame>) -> Option<RingBufferEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(RingBufferEntry { timestamp, frame });
        evicted
    }

    /// Owned copy, oldest first; frames are shared, not cloned.
    pub fn snapshot(&self) -> Vec<RingBufferEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&RingBufferEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(shade: u8) -> Arc<Frame> {
        Arc::new(Frame::filled(2, 2, [shade, shade, shade]))
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buffer = FrameRingBuffer::with_capacity(2);
        assert!(buffer.push(0.0, frame(0)).is_none());
        assert!(buffer.push(1.0, frame(1)).is_none());
        let evicted = buffer.push(2.0, frame(2)).unwrap();
        assert_eq!(evicted.timestamp, 0.0);
        let stamps: Vec<f64> = buffer.snapshot().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![1.0, 2.0]);
        assert_eq!(buffer.latest().map(|e| e.timestamp), Some(2.0));
    }

    #[test]
    fn snapshot_shares_frames() {
        let mut buffer = FrameRingBuffer::with_capacity(4);
        let shared = frame(9);
        buffer.push(0.0, Arc::clone(&shared));
        let snapshot = buffer.snapshot();
        buffer.clear();
        assert!(Arc::ptr_eq(&snapshot[0].frame, &shared));
        assert!(buffer.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = FrameRingBuffer::with_capacity(0);
        buffer.push(0.0, frame(0));
        buffer.push(1.0, frame(1));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.capacity(), 1);
    }
}
