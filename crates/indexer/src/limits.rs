const MAX_INDEX_CONCURRENCY: usize = 32;

/// Environment override for the sidecar read fan-out.
pub const INDEX_CONCURRENCY_ENV: &str = "ASSETPACK_INDEX_CONCURRENCY";

fn default_index_concurrency() -> usize {
    // Sidecar reads are small and IO bound, so allow more in flight than there are cores.
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
        .clamp(2, 16)
}

fn parse_index_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_INDEX_CONCURRENCY)
}

/// Number of sidecar reads allowed in flight while building an index.
pub fn index_concurrency() -> usize {
    let raw = std::env::var(INDEX_CONCURRENCY_ENV).ok();
    parse_index_concurrency(raw.as_deref(), default_index_concurrency())
}
