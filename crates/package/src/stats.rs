use serde::{Deserialize, Serialize};

/// Statistics about one packing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackStats {
    /// Assets written to the archive
    pub assets: usize,

    /// Assets packed with a generated sidecar
    pub synthesized_sidecars: usize,

    /// Add requests ignored because the asset was already packed
    pub duplicates: usize,

    /// Time from writer creation to finish, in milliseconds
    pub time_ms: u64,
}

/// Statistics about one extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnpackStats {
    /// Complete entries handed out (or written to disk)
    pub entries: usize,

    /// Archive members skipped as malformed or unknown
    pub skipped: usize,

    /// GUIDs still missing a part when the stream ended
    pub incomplete: usize,
}
