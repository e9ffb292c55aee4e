//! Classification of ffmpeg audio diagnostic output.
//!
//! ffmpeg's `silencedetect` and `astats` filters report on stderr in two
//! styles: human-readable summaries (`silence_end: 12.3 | silence_duration: 7.5`,
//! `RMS level dB: -20.1`) and `key=value` frame metadata printed by the
//! `ametadata` filter (`lavfi.astats.Overall.RMS_level=-18.231`).
//!
//! [`LineClassifier`] turns one such line into zero or more [`Observation`]s.
//!
//! # Example
//!
//! ```
//! use ffmpeg_diag::{LineClassifier, Observation};
//!
//! let classifier = LineClassifier::new();
//! let observations = classifier.classify("lavfi.astats.1.Overall.RMS_level=-18.231");
//! assert_eq!(observations, vec![Observation::RmsLevel { db: -18.231 }]);
//! ```

mod classifier;
mod observation;

pub use classifier::{LineClassifier, METADATA_MARKER, SILENCE_END_MARKER, SILENCE_START_MARKER};
pub use observation::Observation;
