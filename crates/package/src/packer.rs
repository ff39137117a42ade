use crate::entry::EntryKind;
use crate::error::{PackageError, Result};
use crate::stats::PackStats;
use assetpack_protocol::paths::relative_forward_path;
use assetpack_reference::{asset_path, sidecar_path, GUID_LEN};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Buffer used while streaming asset bodies into the archive.
const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Marker preceding the GUID inside a sidecar.
const GUID_MARKER: &[u8] = b"guid: ";

struct PackerState<W: Write> {
    builder: tar::Builder<GzEncoder<W>>,
    packed: HashSet<PathBuf>,
    generated: HashSet<String>,
    stats: PackStats,
    /// A member write failed midway; the tar stream can no longer be trusted.
    broken: bool,
}

/// Writes assets into a gzip-compressed tar package, three members per asset:
/// `<guid>/asset`, `<guid>/asset.meta` and `<guid>/pathname`.
///
/// `add_asset` takes `&self` and may be called from several threads; member writes are
/// serialized internally so the three members of one asset stay together.
pub struct Packer<W: Write> {
    project_root: PathBuf,
    started: Instant,
    state: Mutex<PackerState<W>>,
}

impl Packer<BufWriter<File>> {
    /// Create (or truncate) the package file at `output`.
    pub fn create(project_root: impl Into<PathBuf>, output: &Path) -> Result<Self> {
        let file = File::create(output)?;
        log::debug!("Writing package {}", output.display());
        Ok(Self::new(project_root, BufWriter::new(file)))
    }
}

impl<W: Write> Packer<W> {
    pub fn new(project_root: impl Into<PathBuf>, writer: W) -> Self {
        let builder = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
        Self {
            project_root: project_root.into(),
            started: Instant::now(),
            state: Mutex::new(PackerState {
                builder,
                packed: HashSet::new(),
                generated: HashSet::new(),
                stats: PackStats::default(),
                broken: false,
            }),
        }
    }

    /// Add one asset. A sidecar path stands for its asset; relative paths are taken from the
    /// project root.
    ///
    /// Returns `Ok(false)` when the asset was already packed by this writer.
    pub fn add_asset(&self, path: &Path) -> Result<bool> {
        let asset = asset_path(path);
        let asset = if asset.is_absolute() {
            asset
        } else {
            self.project_root.join(asset)
        };

        // Size and mtime come from the open handle so the header matches what gets streamed.
        let file = match File::open(&asset) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackageError::NotFound(asset))
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(PackageError::NotFound(asset));
        }
        let relative = relative_forward_path(&self.project_root, &asset)
            .ok_or_else(|| PackageError::OutsideProject(asset.clone()))?;
        let sidecar = read_sidecar(&asset)?;

        let mut state = self.lock()?;
        if state.broken {
            return Err(PackageError::WriterPoisoned);
        }
        if state.packed.contains(&asset) {
            state.stats.duplicates += 1;
            log::debug!("{relative} is already packed");
            return Ok(false);
        }

        let (guid, sidecar_bytes) = match sidecar {
            Some(found) => found,
            None => {
                let guid = generate_guid(&mut state.generated);
                log::warn!("Missing sidecar for {relative}; packing it as {guid}");
                state.stats.synthesized_sidecars += 1;
                let body = format!("guid: {guid}\n").into_bytes();
                (guid, body)
            }
        };

        let size = metadata.len();
        let body = ExactBody::new(BufReader::with_capacity(COPY_BUFFER_SIZE, file), size);
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_secs());

        let written = append(&mut state.builder, &guid, EntryKind::Asset, size, mtime, body)
            .and_then(|()| {
                append(
                    &mut state.builder,
                    &guid,
                    EntryKind::Sidecar,
                    sidecar_bytes.len() as u64,
                    mtime,
                    sidecar_bytes.as_slice(),
                )
            })
            .and_then(|()| {
                append(
                    &mut state.builder,
                    &guid,
                    EntryKind::Pathname,
                    relative.len() as u64,
                    now_secs(),
                    relative.as_bytes(),
                )
            });
        if let Err(e) = written {
            log::error!("Package stream broken while writing {relative}: {e}");
            state.broken = true;
            return Err(e);
        }

        state.packed.insert(asset);
        state.stats.assets += 1;
        log::info!("Packed {relative}");
        Ok(true)
    }

    /// Add every path, stopping at the first failure. Returns how many were newly packed.
    pub fn add_assets<I, P>(&self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut added = 0;
        for path in paths {
            if self.add_asset(path.as_ref())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Whether `path` (or the asset behind a sidecar path) has been packed already.
    pub fn contains(&self, path: &Path) -> bool {
        let asset = asset_path(path);
        self.lock()
            .map(|state| state.packed.contains(&asset))
            .unwrap_or(false)
    }

    /// Write the archive trailer, flush the compressor and hand back the writer.
    pub fn finish(self) -> Result<(W, PackStats)> {
        let state = self
            .state
            .into_inner()
            .map_err(|_| PackageError::WriterPoisoned)?;
        if state.broken {
            return Err(PackageError::WriterPoisoned);
        }
        let encoder = state.builder.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;

        let mut stats = state.stats;
        #[allow(clippy::cast_possible_truncation)]
        {
            stats.time_ms = self.started.elapsed().as_millis() as u64;
        }
        log::info!(
            "Package complete: {} assets ({} generated sidecars) in {}ms",
            stats.assets,
            stats.synthesized_sidecars,
            stats.time_ms
        );
        Ok((writer, stats))
    }

    fn lock(&self) -> Result<MutexGuard<'_, PackerState<W>>> {
        self.state.lock().map_err(|_| PackageError::WriterPoisoned)
    }
}

fn append<W: Write, R: Read>(
    builder: &mut tar::Builder<W>,
    guid: &str,
    kind: EntryKind,
    size: u64,
    mtime: u64,
    body: R,
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    builder.append_data(&mut header, kind.member_name(guid), body)?;
    Ok(())
}

/// Yields exactly `remaining` bytes of `inner`, failing if the source ends sooner.
///
/// The tar header is written before the body, so a short body would otherwise leave a member
/// padded to the wrong length.
struct ExactBody<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> ExactBody<R> {
    fn new(inner: R, remaining: u64) -> Self {
        Self { inner, remaining }
    }
}

impl<R: Read> Read for ExactBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = usize::try_from(self.remaining).map_or(buf.len(), |left| left.min(buf.len()));
        let n = self.inner.read(&mut buf[..limit])?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("asset shrank while packing; {} bytes missing", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// GUID and raw bytes of the sidecar next to `asset`, or `None` when there is no sidecar.
fn read_sidecar(asset: &Path) -> Result<Option<(String, Vec<u8>)>> {
    let path = sidecar_path(asset);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let guid = sidecar_guid(&bytes).ok_or(PackageError::MalformedSidecar(path))?;
    Ok(Some((guid, bytes)))
}

/// The fixed-width GUID following the first `guid: ` marker.
fn sidecar_guid(bytes: &[u8]) -> Option<String> {
    let start = bytes
        .windows(GUID_MARKER.len())
        .position(|window| window == GUID_MARKER)?
        + GUID_MARKER.len();
    let raw = bytes.get(start..start + GUID_LEN)?;
    let guid = std::str::from_utf8(raw).ok()?;
    guid.bytes()
        .all(|b| b.is_ascii_alphanumeric())
        .then(|| guid.to_string())
}

/// A fresh 32-character lowercase hex id, unique among those generated by this packer.
fn generate_guid(generated: &mut HashSet<String>) -> String {
    loop {
        let guid = uuid::Uuid::new_v4().simple().to_string();
        if generated.insert(guid.clone()) {
            return guid;
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
