//! # Asset Reference Parser
//!
//! Extracts identity and reference tokens from serialized asset text.
//!
//! ```text
//! sidecar text ──> read_identity   ──> Identifier (last guid / fileID wins)
//! asset text   ──> read_references ──> [Identifier] (adjacent tokens merged)
//! ```
//!
//! Both functions are pure; the `*_file` variants only add the read and the extension
//! allow-list check.
//!
//! ## Example
//!
//! ```
//! use assetpack_reference::read_references;
//!
//! let refs = read_references("m_Tex: {fileID: 2800000, guid: 5f34a1c9b2e84d1f9a0b3c4d5e6f7a8b, type: 3}");
//! assert_eq!(refs.len(), 1);
//! assert_eq!(refs[0].local_id.as_deref(), Some("2800000"));
//! ```

mod error;
mod parser;
mod sidecar;
mod types;

pub use error::{ReferenceError, Result};
pub use parser::{
    has_reference_table, read_identity, read_identity_file, read_references,
    read_references_file, REFERENCE_EXTENSIONS,
};
pub use sidecar::{asset_path, is_sidecar, sidecar_path};
pub use types::{Guid, Identifier, ReferenceList, GUID_LEN};
