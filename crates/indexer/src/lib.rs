//! # Asset Indexer
//!
//! Project-wide GUID index built from sidecar files.
//!
//! ## Pipeline
//!
//! ```text
//! Project root
//!     │
//!     ├──> File Scanner (include / exclude globs)
//!     │      └─> Sidecar files (*.meta)
//!     │
//!     ├──> Sidecar reads (bounded fan-out)
//!     │      └─> Identifier per asset
//!     │
//!     └──> Sequential merge
//!            └─> AssetIndex (GUID -> path, path -> identity)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use assetpack_indexer::{AssetIndex, FileScanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sidecars = FileScanner::new("/path/to/project/Assets")
//!         .include(["**/*.meta"])
//!         .scan()?;
//!     let (index, stats) = AssetIndex::build(sidecars).await;
//!
//!     println!("Indexed {} files, {} GUIDs", stats.files, index.guid_count());
//!     Ok(())
//! }
//! ```

mod error;
mod index;
mod limits;
mod scanner;
mod stats;

pub use error::{IndexerError, Result};
pub use index::AssetIndex;
pub use limits::{index_concurrency, INDEX_CONCURRENCY_ENV};
pub use scanner::FileScanner;
pub use stats::IndexStats;
