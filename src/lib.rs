// Core modules
pub mod config;
pub mod consts;
pub mod error;
pub mod lock;
pub mod metrics;

// Operation surface and mount composition
pub mod mount; // src/mount.rs: bind/overlay projection of a snapshot chain
pub mod snapshotter; // src/snapshotter/{mod,usage,cleanup}.rs

// Internals
mod dir; // src/dir.rs: snapshots/<id> tree, staging, reconciliation input
mod store; // src/store/{mod,record,txn}.rs: records, txns, metadata.db codec

// Utilities (now_millis, random_suffix)
pub mod util;

// Convenient re-exports
pub use config::{RemovalPolicy, ShaleConfig};
pub use error::{Error, Result};
pub use metrics::{Metrics, MetricsSnapshot};
pub use mount::Mount;
pub use snapshotter::{DoctorReport, Snapshotter};
pub use store::{Filter, Info, Kind, Usage};
