pub mod identity;
pub mod monitor;
pub mod occupancy;
pub mod tracker;
pub mod zone;

pub use identity::{IdentityRegistry, Resolution, SubmergedCandidate};
pub use monitor::{
    AlertKind, AlertRequest, Identity, MissingPersonMonitor, PresenceState, RescueTarget,
};
pub use occupancy::{OccupancySnapshot, OccupancyTracker};
pub use tracker::{FrameReport, Observation, Tracker};
pub use zone::{Zone, ZoneClassifier, ZoneSet};
