use std::fmt;

/// A single health signal extracted from one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Audio dropped below the noise floor for at least the minimum duration.
    SilenceStart,
    /// Silence is over.
    ///
    /// `duration_secs` is `None` when the line carried no parsable
    /// `silence_duration` token; the silence still counts as ended.
    SilenceEnd { duration_secs: Option<f64> },
    /// RMS level in dBFS.
    RmsLevel { db: f64 },
    /// Peak level in dBFS.
    PeakLevel { db: f64 },
    /// Newly reported clipped samples. Always greater than zero.
    ClippedSamples { count: u64 },
    /// Dynamic range in dB.
    DynamicRange { db: f64 },
}

impl Observation {
    /// Whether this observation drives the silence state machine.
    pub fn is_silence(&self) -> bool {
        matches!(self, Self::SilenceStart | Self::SilenceEnd { .. })
    }

    /// Short, stable name of the observation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SilenceStart => "silence_start",
            Self::SilenceEnd { .. } => "silence_end",
            Self::RmsLevel { .. } => "rms_level",
            Self::PeakLevel { .. } => "peak_level",
            Self::ClippedSamples { .. } => "clipped_samples",
            Self::DynamicRange { .. } => "dynamic_range",
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SilenceStart => write!(f, "silence_start"),
            Self::SilenceEnd {
                duration_secs: Some(d),
            } => write!(f, "silence_end duration={:.2}s", d),
            Self::SilenceEnd {
                duration_secs: None,
            } => write!(f, "silence_end"),
            Self::RmsLevel { db } => write!(f, "rms_level={} dB", db),
            Self::PeakLevel { db } => write!(f, "peak_level={} dB", db),
            Self::ClippedSamples { count } => write!(f, "clipped_samples=+{}", count),
            Self::DynamicRange { db } => write!(f, "dynamic_range={} dB", db),
        }
    }
}
