pub mod clip;
pub mod dispatcher;
pub mod media;
pub mod ring_buffer;
pub mod stamp;

pub use clip::{select_pre_event_frames, ClipPlan};
pub use dispatcher::{AlertDispatcher, AlertJob};
pub use media::{ClipSummary, DeliveryError, DeliveryResult};
pub use ring_buffer::{FrameRingBuffer, RingBufferEntry};
pub use stamp::stamp_capture_time;
