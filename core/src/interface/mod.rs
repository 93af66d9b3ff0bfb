pub mod detection;
pub mod frame;
pub mod transport;
pub mod zones;

pub use detection::{BoundingBox, Detection, DetectionFrame};
pub use frame::{Frame, TimedFrame};
pub use transport::{NotificationTransport, TransportError, TransportResult};
pub use zones::ZoneConfig;
