use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a well-formed global identifier.
pub const GUID_LEN: usize = 32;

/// Project-wide asset identifier as it appears in sidecar and asset text.
///
/// The parser keeps whatever token follows `guid: `, so a `Guid` is not guaranteed to be
/// well formed; use [`Guid::is_well_formed`] when that matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Accepts only 32 lowercase hex characters.
    pub fn parse(value: &str) -> Option<Self> {
        let guid = Self(value.to_string());
        guid.is_well_formed().then_some(guid)
    }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == GUID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// The all-zero identifier used by the engine for built-in references.
    pub fn is_null(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Guid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `(localId, globalId)` pair. Either half may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Sub-object id inside one serialized document (`fileID`).
    pub local_id: Option<String>,

    /// Project-wide asset id (`guid`).
    pub guid: Option<Guid>,
}

impl Identifier {
    pub fn has_guid(&self) -> bool {
        self.guid.is_some()
    }

    /// Neither half set.
    pub fn is_empty(&self) -> bool {
        self.local_id.is_none() && self.guid.is_none()
    }
}

/// References in document order; duplicates and guid-less entries are kept.
pub type ReferenceList = Vec<Identifier>;
