//! Semantic checks applied after deserialization.

use super::Config;
use crate::ConfigError;

/// Highest Brotli quality level.
pub const MAX_BROTLI_QUALITY: u32 = 11;
/// Accepted Brotli window range in bits.
pub const BROTLI_WINDOW_RANGE: std::ops::RangeInclusive<u32> = 10..=24;

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "upload.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.upload.base_delay_ms > self.upload.max_delay_ms {
            return Err(ConfigError::Validation(format!(
                "upload.base_delay_ms ({}) must not exceed upload.max_delay_ms ({})",
                self.upload.base_delay_ms, self.upload.max_delay_ms
            )));
        }
        if self.convert.brotli_quality > MAX_BROTLI_QUALITY {
            return Err(ConfigError::Validation(format!(
                "convert.brotli_quality must be 0-{MAX_BROTLI_QUALITY}, got {}",
                self.convert.brotli_quality
            )));
        }
        if !BROTLI_WINDOW_RANGE.contains(&self.convert.brotli_window) {
            return Err(ConfigError::Validation(format!(
                "convert.brotli_window must be {}-{}, got {}",
                BROTLI_WINDOW_RANGE.start(),
                BROTLI_WINDOW_RANGE.end(),
                self.convert.brotli_window
            )));
        }
        if self.convert.max_concurrent == 0 {
            return Err(ConfigError::Validation(
                "convert.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.convert.scratch_max_entries == 0 {
            return Err(ConfigError::Validation(
                "convert.scratch_max_entries must be at least 1".to_string(),
            ));
        }
        if self.convert.scratch_max_mb == 0 {
            return Err(ConfigError::Validation(
                "convert.scratch_max_mb must be at least 1".to_string(),
            ));
        }
        if self.storage.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "storage.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.artifacts.font_display.trim().is_empty() {
            return Err(ConfigError::Validation(
                "artifacts.font_display must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
