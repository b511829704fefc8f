//! Shared layout and format constants (root layout, metadata file, labels).

// -------- Root layout --------
// <root>/snapshots/<id>/fs        snapshot content (overlay upper for Active)
// <root>/snapshots/<id>/work      overlay workdir (Active only)
// <root>/metadata.db              snapshot index
// <root>/LOCK                     advisory root lock
pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const FS_DIR: &str = "fs";
pub const WORK_DIR: &str = "work";
pub const METADATA_FILE: &str = "metadata.db";
pub const LOCK_FILE: &str = "LOCK";

// Staging directories live next to committed ones and are reclaimed by
// cleanup if leaked; the prefix can never collide with a numeric id.
pub const STAGING_PREFIX: &str = "new-";

// -------- metadata.db --------
// Header (16 B): [magic8="SHALEDB1"][version u32][crc32 u32], CRC over the body.
// Body: [next_id u64][count u32] then one record per entry (see store::record).
pub const META_MAGIC: &[u8; 8] = b"SHALEDB1";
pub const META_VERSION: u32 = 1;
pub const META_HDR_SIZE: usize = 16;

// -------- Kind codes (persisted, stable) --------
pub const KIND_VIEW: u8 = 1;
pub const KIND_ACTIVE: u8 = 2;
pub const KIND_COMMITTED: u8 = 3;

// -------- Labels --------
/// Reserved label surfacing the live upper directory of an Active snapshot.
/// Synthesized on read from (root, id), never stored.
pub const LABEL_UPPERDIR: &str = "shale.dev/overlay.upperdir";
