//! Line classification for ffmpeg `silencedetect` / `astats` output.
//!
//! Silence markers are checked first and are exclusive of each other. Every
//! other rule is independent: a line is run through the whole registry and
//! may yield several observations.

use std::sync::LazyLock;

use regex::Regex;

use crate::Observation;

/// Marker printed by `silencedetect` when a silence interval begins.
pub const SILENCE_START_MARKER: &str = "silence_start";
/// Marker printed by `silencedetect` when a silence interval ends.
pub const SILENCE_END_MARKER: &str = "silence_end";
/// Namespace of the frame metadata keys published by `astats`.
pub const METADATA_MARKER: &str = "lavfi.astats.";

static SILENCE_DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"silence_duration: ([0-9.]+)").unwrap());
static RMS_LEVEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RMS level(?: dB)?:?\s*(-?[0-9]+(?:\.[0-9]+)?)").unwrap());
static PEAK_LEVEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Peak level(?: dB)?:?\s*(-?[0-9]+(?:\.[0-9]+)?)").unwrap());
static CLIPPED_SAMPLES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Number of clipped samples:?\s*([0-9]+)").unwrap());
static DYNAMIC_RANGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Dynamic range(?: dB)?:?\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Builds an observation from the text a matcher extracted.
type ObservationConstructor = fn(&str) -> Option<Observation>;

/// How a rule locates the text handed to its constructor.
enum Matcher {
    /// First capture group of the regex.
    Capture(&'static LazyLock<Regex>),
    /// Everything after the marker.
    After(&'static str),
}

impl Matcher {
    fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            Self::Capture(regex) => regex
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
            Self::After(marker) => line
                .find(marker)
                .map(|start| &line[start + marker.len()..]),
        }
    }
}

struct Rule {
    matcher: Matcher,
    constructor: ObservationConstructor,
}

// Evaluated in order against every line.
static RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::Capture(&RMS_LEVEL_REGEX),
        constructor: rms_level,
    },
    Rule {
        matcher: Matcher::Capture(&PEAK_LEVEL_REGEX),
        constructor: peak_level,
    },
    Rule {
        matcher: Matcher::Capture(&CLIPPED_SAMPLES_REGEX),
        constructor: clipped_samples,
    },
    Rule {
        matcher: Matcher::Capture(&DYNAMIC_RANGE_REGEX),
        constructor: dynamic_range,
    },
    Rule {
        matcher: Matcher::After(METADATA_MARKER),
        constructor: astats_metadata,
    },
];

fn rms_level(value: &str) -> Option<Observation> {
    value.parse().ok().map(|db| Observation::RmsLevel { db })
}

fn peak_level(value: &str) -> Option<Observation> {
    value.parse().ok().map(|db| Observation::PeakLevel { db })
}

fn clipped_samples(value: &str) -> Option<Observation> {
    value
        .parse::<u64>()
        .ok()
        .filter(|&count| count > 0)
        .map(|count| Observation::ClippedSamples { count })
}

fn dynamic_range(value: &str) -> Option<Observation> {
    value.parse().ok().map(|db| Observation::DynamicRange { db })
}

/// Parse `<channel>.<Key>=<value>` as printed by `ametadata=print`.
fn astats_metadata(fragment: &str) -> Option<Observation> {
    let (key, value) = fragment.split_once('=')?;
    let value: f64 = value.trim().parse().ok()?;
    let key = key.trim().to_ascii_lowercase();

    if key.ends_with("rms_level") {
        Some(Observation::RmsLevel { db: value })
    } else if key.ends_with("peak_level") {
        Some(Observation::PeakLevel { db: value })
    } else if key.ends_with("clipped_samples") {
        // Fractional counts truncate; a zero delta is never reported.
        if !value.is_finite() || value < 1.0 {
            return None;
        }
        Some(Observation::ClippedSamples {
            count: value as u64,
        })
    } else if key.ends_with("dynamic_range") {
        Some(Observation::DynamicRange { db: value })
    } else {
        None
    }
}

/// Silence start and end are mutually exclusive on one line; start wins.
fn classify_silence(line: &str) -> Option<Observation> {
    if line.contains(SILENCE_START_MARKER) {
        return Some(Observation::SilenceStart);
    }

    if line.contains(SILENCE_END_MARKER) {
        let duration_secs = SILENCE_DURATION_REGEX
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());
        return Some(Observation::SilenceEnd { duration_secs });
    }

    None
}

/// Classifies ffmpeg diagnostic lines into [`Observation`]s.
///
/// The classifier is stateless; one instance can be shared by every stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineClassifier;

impl LineClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a single line.
    ///
    /// Values that match a pattern but fail numeric conversion are dropped
    /// without affecting the other rules.
    pub fn classify(&self, line: &str) -> Vec<Observation> {
        let mut observations = Vec::new();
        self.classify_into(line, &mut observations);
        observations
    }

    /// Classify a single line, appending results to `out`.
    pub fn classify_into(&self, line: &str, out: &mut Vec<Observation>) {
        if let Some(observation) = classify_silence(line) {
            out.push(observation);
        }

        for rule in RULES {
            if let Some(observation) = rule.matcher.extract(line).and_then(rule.constructor) {
                out.push(observation);
            }
        }
    }
}
