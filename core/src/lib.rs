//! Swimmer identity, zone occupancy and missing-swimmer alerting for Poolwatch.
//!
//! Detector output flows through [`tracking::Tracker`], which keeps stable
//! identities across track churn and escalates alerts for swimmers that stay
//! out of sight. [`session::WatchSession`] couples it with a frame ring buffer
//! and the asynchronous [`alerting::AlertDispatcher`].

pub mod alerting;
pub mod config;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod session;
pub mod telemetry;
pub mod tracking;

pub use config::{AlertTier, DispatchConfig, MonitorConfig};
pub use prelude::{DisplayId, MonitorError, MonitorResult, Point, ZoneKind};
pub use session::WatchSession;
