//! Exporter configuration.
//!
//! Loaded once at startup from a YAML file. Missing fields fall back to
//! defaults; anything that would make supervision ambiguous (duplicate or
//! blank stream URLs, a noise level that would break the ffmpeg filter
//! graph) is rejected.

mod target;

pub use target::{DEFAULT_NOISE_LEVEL, DEFAULT_SILENCE_MIN_SECONDS, StreamTarget};

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::{Error, Result};

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";

/// Characters that would split or escape the `silencedetect` filter arguments.
const FORBIDDEN_NOISE_CHARS: &[char] = &[':', ',', ';', '[', ']', '\'', '"', '\\'];

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stream URLs, in supervision order.
    #[serde(deserialize_with = "null_as_default")]
    pub streams: Vec<String>,
    /// Minimum duration of a reported silence in seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub silence_min_seconds: f64,
    /// Noise floor for silence detection, e.g. `-30dB`.
    #[serde(deserialize_with = "null_as_default")]
    pub silence_noise_level: String,
    /// ffmpeg binary used for both diagnostics and probes.
    pub ffmpeg_path: String,
    /// Run `astats` alongside `silencedetect` for loudness metrics.
    pub loudness_analysis: bool,
    /// Number of frames `astats` accumulates before publishing.
    pub astats_reset_frames: u32,
    /// Seconds between liveness probe rounds.
    pub probe_interval_secs: u64,
    /// Upper bound on a single liveness probe.
    pub probe_timeout_secs: u64,
    /// Longest diagnostic line accepted before the session is restarted.
    pub max_line_bytes: usize,
    /// HTTP listen address. The command line takes precedence.
    pub listen: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            silence_min_seconds: DEFAULT_SILENCE_MIN_SECONDS,
            silence_noise_level: DEFAULT_NOISE_LEVEL.to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            loudness_analysis: true,
            astats_reset_frames: 50,
            probe_interval_secs: 30,
            probe_timeout_secs: 20,
            max_line_bytes: 64 * 1024,
            listen: None,
        }
    }
}

impl AppConfig {
    /// Load and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_yaml_str(&data)?;
        info!(
            "{} streams loaded from {}",
            config.streams.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse, default and validate a YAML document.
    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(data)?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        if !(self.silence_min_seconds.is_finite() && self.silence_min_seconds > 0.0) {
            self.silence_min_seconds = DEFAULT_SILENCE_MIN_SECONDS;
        }
        if self.silence_noise_level.trim().is_empty() {
            self.silence_noise_level = DEFAULT_NOISE_LEVEL.to_string();
        } else {
            self.silence_noise_level = self.silence_noise_level.trim().to_string();
        }
        for url in &mut self.streams {
            *url = url.trim().to_string();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, url) in self.streams.iter().enumerate() {
            if url.is_empty() {
                return Err(Error::config(format!("stream #{} has an empty URL", index)));
            }
            if !seen.insert(url.as_str()) {
                return Err(Error::config(format!("duplicate stream URL: {}", url)));
            }
        }

        if self
            .silence_noise_level
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_NOISE_CHARS.contains(&c))
        {
            return Err(Error::config(format!(
                "invalid silence_noise_level: {:?}",
                self.silence_noise_level
            )));
        }

        if self.ffmpeg_path.trim().is_empty() {
            return Err(Error::config("ffmpeg_path must not be empty"));
        }
        if self.astats_reset_frames == 0 {
            return Err(Error::config("astats_reset_frames must be positive"));
        }
        if self.probe_interval_secs == 0 {
            return Err(Error::config("probe_interval_secs must be positive"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::config("probe_timeout_secs must be positive"));
        }
        if self.max_line_bytes == 0 {
            return Err(Error::config("max_line_bytes must be positive"));
        }

        if self.streams.is_empty() {
            warn!("No streams configured; only the metrics endpoint will be served");
        }

        Ok(())
    }

    /// Build the immutable per-stream targets.
    pub fn targets(&self) -> Vec<Arc<StreamTarget>> {
        self.streams
            .iter()
            .map(|url| {
                Arc::new(StreamTarget::new(
                    url.clone(),
                    self.silence_min_seconds,
                    &self.silence_noise_level,
                ))
            })
            .collect()
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// A key present with no value (`key:` or `key: ~`) reads as the type's
/// zero value, which `apply_defaults` then replaces.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalize a listen address. A bare `:port` binds all interfaces.
pub fn normalize_listen_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
