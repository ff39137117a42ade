//! # Asset Package Codec
//!
//! Reads and writes asset packages: gzip-compressed tar archives holding one directory per
//! asset GUID.
//!
//! ```text
//! <guid>/asset       raw asset bytes
//! <guid>/asset.meta  sidecar text (generated as "guid: <id>\n" when missing)
//! <guid>/pathname    project-relative path, '/' separated
//! ```
//!
//! Packing streams each asset into the archive as it is added. Unpacking reassembles
//! entries from members in any order, normalizes line endings of text bodies and writes each
//! asset as soon as its three parts are known.
//!
//! ## Example
//!
//! ```no_run
//! use assetpack_package::{Packer, Unpacker};
//! use std::path::Path;
//!
//! # fn main() -> assetpack_package::Result<()> {
//! let packer = Packer::create("/proj", Path::new("out.unitypackage"))?;
//! packer.add_asset(Path::new("/proj/Assets/floor.mat"))?;
//! let (_file, stats) = packer.finish()?;
//! println!("packed {} assets", stats.assets);
//!
//! Unpacker::open(Path::new("out.unitypackage"))?.extract_to(Path::new("/other"))?;
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod normalize;
mod packer;
mod stats;
mod unpacker;

pub use entry::{split_member_name, EntryKind, PackageEntry};
pub use error::{PackageError, Result};
pub use normalize::{copy_normalized, is_text_sample};
pub use packer::Packer;
pub use stats::{PackStats, UnpackStats};
pub use unpacker::Unpacker;
