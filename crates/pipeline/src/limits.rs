const MAX_EMBED_CONCURRENCY: usize = 32;

/// Replies embedded at once when nothing is configured
#[must_use]
pub fn default_embed_concurrency() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if cpus <= 4 {
        1
    } else if cpus <= 12 {
        2
    } else {
        4
    }
}

fn parse_embed_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_EMBED_CONCURRENCY)
}

/// `TREEGPT_EMBED_CONCURRENCY`, else `default_value`, clamped to `1..=32`
#[must_use]
pub fn embed_concurrency_from_env(default_value: usize) -> usize {
    let raw = std::env::var("TREEGPT_EMBED_CONCURRENCY").ok();
    parse_embed_concurrency(raw.as_deref(), default_value)
}

#[must_use]
pub fn clamp_embed_concurrency(value: usize) -> usize {
    value.clamp(1, MAX_EMBED_CONCURRENCY)
}
