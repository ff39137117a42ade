//! # Asset Graph
//!
//! Dependency queries over a project's asset index.
//!
//! ## Queries
//!
//! - **Shallow** - one hop, as files (unresolved GUIDs dropped) or as GUIDs (kept)
//! - **Deep** - worklist closure from a seed set; cycles terminate, each node expands once
//! - **Reverse** - who references a file, by scanning every indexed document
//! - **Scripts** - source files in the closure are handed to an external oracle
//!
//! ## Architecture
//!
//! ```text
//! seed files
//!     │
//!     ├──> DependencyResolver
//!     │      ├─ read_references_file (per document)
//!     │      ├─ AssetIndex::find_path (GUID -> file)
//!     │      └─ worklist + visited set
//!     │
//!     └──> ScriptReferenceOracle (for *.cs in the closure)
//!            └─ unioned into the final set
//! ```

mod error;
mod oracle;
mod resolver;
mod types;

pub use error::{ResolveError, Result};
pub use oracle::{
    is_script, NoScriptOracle, ScriptReferenceMap, ScriptReferenceOracle, StaticScriptOracle,
    SCRIPT_EXTENSION,
};
pub use resolver::DependencyResolver;
pub use types::Closure;
pub use tokio_util::sync::CancellationToken;
