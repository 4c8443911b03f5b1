//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes so a
//! partial config file only overrides the keys it names.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_false() -> bool {
    false
}

pub fn bool_true() -> bool {
    true
}

// ── Catalog ────────────────────────────────────────────────────────────────

pub fn catalog_ttl_secs() -> u64 {
    300
}

pub fn refresh_on_miss_secs() -> u64 {
    30
}

// ── Publish ────────────────────────────────────────────────────────────────

pub fn region() -> String {
    "us-east-1".to_string()
}

/// One year.
pub fn cache_seconds() -> u64 {
    31_536_000
}

// ── Storage ────────────────────────────────────────────────────────────────

pub fn storage_timeout_secs() -> u64 {
    30
}

// ── Upload ─────────────────────────────────────────────────────────────────

pub fn max_attempts() -> u32 {
    3
}

pub fn base_delay_ms() -> u64 {
    500
}

pub fn max_delay_ms() -> u64 {
    8000
}

// ── Convert ────────────────────────────────────────────────────────────────

pub fn brotli_quality() -> u32 {
    11
}

pub fn brotli_window() -> u32 {
    22
}

pub fn max_concurrent() -> usize {
    2
}

pub fn scratch_max_age_hours() -> u64 {
    24
}

pub fn scratch_max_entries() -> usize {
    1000
}

pub fn scratch_max_mb() -> u64 {
    500
}

// ── Artifacts ──────────────────────────────────────────────────────────────

pub fn font_display() -> String {
    "swap".to_string()
}

pub fn sample_text() -> String {
    "The quick brown fox jumps over the lazy dog 0123456789".to_string()
}
