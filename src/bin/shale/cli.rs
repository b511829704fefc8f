use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for the shale overlay snapshotter
#[derive(Parser, Debug)]
#[command(name = "shale", version, about = "Overlay snapshot manager CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Initialize a snapshot root (idempotent)
    Init {
        #[arg(long)]
        path: PathBuf,
    },
    /// Describe one snapshot
    Stat {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// JSON output (single object)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List snapshots, optionally filtered
    ///
    /// Examples:
    ///   shale list --path ./root
    ///   shale list --path ./root --kind committed --label tier=base
    List {
        #[arg(long)]
        path: PathBuf,
        /// Exact key to match
        #[arg(long)]
        name: Option<String>,
        /// Kind to match: view | active | committed
        #[arg(long)]
        kind: Option<String>,
        /// Parent key to match
        #[arg(long)]
        parent: Option<String>,
        /// Label clause: `key` (presence) or `key=value` (equality). Repeatable;
        /// clauses must all hold.
        #[arg(long)]
        label: Vec<String>,
        /// JSON output (array)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create a writable snapshot and print its mounts
    Prepare {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// Committed parent key; omit for a root layer
        #[arg(long, default_value = "")]
        parent: String,
        /// Label `key=value`; repeatable
        #[arg(long)]
        label: Vec<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Create a read-only snapshot and print its mounts
    View {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// Committed parent key; omit for a root layer
        #[arg(long, default_value = "")]
        parent: String,
        /// Label `key=value`; repeatable
        #[arg(long)]
        label: Vec<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the mounts of an existing active or view snapshot
    Mounts {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Promote an active snapshot to a committed layer
    ///
    /// Example:
    ///   shale commit --path ./root --key build --name layer-3
    Commit {
        #[arg(long)]
        path: PathBuf,
        /// Key of the active snapshot
        #[arg(long)]
        key: String,
        /// Name of the new committed layer
        #[arg(long)]
        name: String,
        /// Label `key=value` for the committed record; repeatable
        #[arg(long)]
        label: Vec<String>,
    },
    /// Remove a snapshot (fails while it still has children)
    Remove {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
    },
    /// Measure disk usage of a snapshot
    Usage {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Set or delete labels on a snapshot
    ///
    /// Example:
    ///   shale label --path ./root --key build --set tier=base --unset tmp
    Label {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        key: String,
        /// Label `key=value` to set; repeatable
        #[arg(long)]
        set: Vec<String>,
        /// Label key to delete; repeatable
        #[arg(long)]
        unset: Vec<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Remove directories no live snapshot references
    Cleanup {
        #[arg(long)]
        path: PathBuf,
    },
    /// Audit consistency of index against directory tree (read-only)
    Doctor {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print root summary: config, record counts, metrics
    Status {
        #[arg(long)]
        path: PathBuf,
        /// JSON output (single object)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Cli as Parser>::parse()
    }
}
