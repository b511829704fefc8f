//! Centralized configuration for the snapshotter.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - ShaleConfig::from_env() keeps env-driven deployments working; fluent
//!   setters override individual fields programmatically.
//!
//! Removal policy is an explicit enum passed at construction: the
//! reconciliation path depends only on (live id set) x (disk listing), never
//! on a flag read mid-flight.

use std::fmt;

/// When physical directory deletion happens relative to metadata removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Remove orphan directories before `remove()` returns (the orphan scan
    /// runs inside the write transaction, unlinks after it commits).
    Synchronous,
    /// Skip the scan; orphans accumulate until an explicit `cleanup()`.
    Deferred,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPolicy::Synchronous => write!(f, "synchronous"),
            RemovalPolicy::Deferred => write!(f, "deferred"),
        }
    }
}

/// Top-level configuration for a [`crate::Snapshotter`].
#[derive(Clone, Debug)]
pub struct ShaleConfig {
    /// Physical removal policy.
    /// Env: SHALE_ASYNC_REMOVE ("1|true|yes|on" => Deferred; default Synchronous)
    pub removal: RemovalPolicy,

    /// Surface the reserved upper-directory label on Active records.
    /// Env: SHALE_UPPERDIR_LABEL (default false)
    pub upperdir_label: bool,
}

impl Default for ShaleConfig {
    fn default() -> Self {
        Self {
            removal: RemovalPolicy::Synchronous,
            upperdir_label: false,
        }
    }
}

fn env_truthy(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_ascii_lowercase())
        .map(|s| s == "1" || s == "true" || s == "yes" || s == "on")
}

impl ShaleConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(on) = env_truthy("SHALE_ASYNC_REMOVE") {
            cfg.removal = if on {
                RemovalPolicy::Deferred
            } else {
                RemovalPolicy::Synchronous
            };
        }
        if let Some(on) = env_truthy("SHALE_UPPERDIR_LABEL") {
            cfg.upperdir_label = on;
        }
        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_removal(mut self, policy: RemovalPolicy) -> Self {
        self.removal = policy;
        self
    }

    pub fn with_upperdir_label(mut self, on: bool) -> Self {
        self.upperdir_label = on;
        self
    }
}

impl fmt::Display for ShaleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShaleConfig {{ removal: {}, upperdir_label: {} }}",
            self.removal, self.upperdir_label,
        )
    }
}
