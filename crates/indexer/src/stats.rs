use serde::{Deserialize, Serialize};

/// Statistics about one index build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Sidecar files read successfully
    pub files: usize,

    /// Files whose identity carries a GUID
    pub guids: usize,

    /// Files indexed by path only (no GUID in the sidecar)
    pub without_guid: usize,

    /// GUIDs claimed by more than one file; the later file wins
    pub duplicate_guids: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files skipped because they could not be read
    pub errors: Vec<String>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, has_guid: bool) {
        self.files += 1;
        if has_guid {
            self.guids += 1;
        } else {
            self.without_guid += 1;
        }
    }

    pub fn add_duplicate(&mut self) {
        self.duplicate_guids += 1;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}
