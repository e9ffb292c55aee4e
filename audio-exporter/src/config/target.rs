//! Per-stream monitoring target.

use std::fmt;

/// Minimum silence duration used when the configured value is unset or not positive.
pub const DEFAULT_SILENCE_MIN_SECONDS: f64 = 5.0;

/// Noise floor used when the configured value is blank.
pub const DEFAULT_NOISE_LEVEL: &str = "-30dB";

/// A stream under supervision together with its silence thresholds.
///
/// Built once from configuration and shared read-only by the supervisor
/// and the prober.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTarget {
    /// Stream URL. Doubles as the `url` label of every metric.
    pub url: String,
    /// Minimum silence duration in seconds.
    pub silence_min_seconds: f64,
    /// Noise floor for silence detection (e.g. `-30dB`).
    pub noise_level: String,
}

impl StreamTarget {
    /// Create a target, substituting defaults for unusable thresholds.
    pub fn new(url: impl Into<String>, silence_min_seconds: f64, noise_level: &str) -> Self {
        let silence_min_seconds = if silence_min_seconds.is_finite() && silence_min_seconds > 0.0
        {
            silence_min_seconds
        } else {
            DEFAULT_SILENCE_MIN_SECONDS
        };

        let noise_level = match noise_level.trim() {
            "" => DEFAULT_NOISE_LEVEL.to_string(),
            level => level.to_string(),
        };

        Self {
            url: url.into(),
            silence_min_seconds,
            noise_level,
        }
    }

    /// Create a target with default thresholds.
    pub fn with_defaults(url: impl Into<String>) -> Self {
        Self::new(url, DEFAULT_SILENCE_MIN_SECONDS, DEFAULT_NOISE_LEVEL)
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (noise={}, d={}s)",
            self.url, self.noise_level, self.silence_min_seconds
        )
    }
}
