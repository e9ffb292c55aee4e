//! Per-stream silence state machine.
//!
//! `silencedetect` keeps printing `silence_start` while a silence persists,
//! so entering [`SilenceState::Silent`] is idempotent. `silence_end` always
//! returns to [`SilenceState::Audible`] and clears the active flag, even
//! when the matching start was never seen.

use ffmpeg_diag::Observation;

use crate::metrics::{MetricsSink, StreamMetric};

/// Whether a stream is currently inside a reported silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SilenceState {
    #[default]
    Audible,
    Silent,
}

/// Metric side effect of a silence transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SilenceEffect {
    /// Set the silence-active gauge.
    SetActive(bool),
    /// Set the last-silence-duration gauge (seconds).
    SetDuration(f64),
}

impl SilenceEffect {
    /// Write this effect to the sink for `stream`.
    pub fn apply_to(&self, sink: &dyn MetricsSink, stream: &str) {
        match *self {
            Self::SetActive(active) => {
                sink.set_gauge(
                    StreamMetric::SilenceActive,
                    stream,
                    if active { 1.0 } else { 0.0 },
                );
            }
            Self::SetDuration(secs) => {
                sink.set_gauge(StreamMetric::SilenceDuration, stream, secs);
            }
        }
    }
}

/// Result of applying one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SilenceState,
    pub effects: Vec<SilenceEffect>,
}

impl Transition {
    fn unchanged(state: SilenceState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

impl SilenceState {
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }

    /// Apply an observation. Non-silence observations leave the state
    /// untouched and produce no effects.
    pub fn apply(self, observation: &Observation) -> Transition {
        match (self, observation) {
            (Self::Audible, Observation::SilenceStart) => Transition {
                state: Self::Silent,
                effects: vec![SilenceEffect::SetActive(true)],
            },
            (Self::Silent, Observation::SilenceStart) => Transition::unchanged(self),
            (_, Observation::SilenceEnd { duration_secs }) => {
                let mut effects = Vec::with_capacity(2);
                if let Some(secs) = duration_secs {
                    effects.push(SilenceEffect::SetDuration(*secs));
                }
                effects.push(SilenceEffect::SetActive(false));
                Transition {
                    state: Self::Audible,
                    effects,
                }
            }
            _ => Transition::unchanged(self),
        }
    }
}
