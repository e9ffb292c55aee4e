//! Routes classified diagnostic lines of one stream into the metrics sink.

use std::sync::Arc;

use ffmpeg_diag::{LineClassifier, Observation};
use tracing::{info, trace};

use super::silence::SilenceState;
use crate::metrics::{MetricsSink, StreamMetric};

/// Per-stream line processor.
///
/// Owns the stream's [`SilenceState`]; silence observations go through the
/// state machine, everything else is written to the sink directly.
pub struct StreamRecorder {
    url: String,
    sink: Arc<dyn MetricsSink>,
    classifier: LineClassifier,
    state: SilenceState,
    scratch: Vec<Observation>,
}

impl StreamRecorder {
    pub fn new(url: impl Into<String>, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            url: url.into(),
            sink,
            classifier: LineClassifier::new(),
            state: SilenceState::default(),
            scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> SilenceState {
        self.state
    }

    /// Start from a clean slate for a new diagnostic session.
    pub fn begin_session(&mut self) {
        self.state = SilenceState::Audible;
        self.sink.set_gauge(StreamMetric::SilenceActive, &self.url, 0.0);
        self.sink.set_gauge(StreamMetric::SilenceDuration, &self.url, 0.0);
    }

    /// Classify one line and apply every resulting observation.
    /// Returns the number of observations.
    pub fn process_line(&mut self, line: &str) -> usize {
        let mut observations = std::mem::take(&mut self.scratch);
        observations.clear();
        self.classifier.classify_into(line, &mut observations);

        let count = observations.len();
        for observation in observations.drain(..) {
            self.apply(observation);
        }
        self.scratch = observations;
        count
    }

    /// Apply a single observation.
    pub fn apply(&mut self, observation: Observation) {
        if observation.is_silence() {
            let transition = self.state.apply(&observation);
            match (self.state, transition.state) {
                (SilenceState::Audible, SilenceState::Silent) => {
                    info!("Silence start detected on {}", self.url);
                }
                (_, SilenceState::Audible) => {
                    if let Observation::SilenceEnd {
                        duration_secs: Some(secs),
                    } = observation
                    {
                        info!("Silence end on {} duration={:.2}s", self.url, secs);
                    }
                }
                _ => {}
            }
            for effect in &transition.effects {
                effect.apply_to(self.sink.as_ref(), &self.url);
            }
            self.state = transition.state;
            return;
        }

        trace!(url = %self.url, %observation, "observation");
        match observation {
            Observation::RmsLevel { db } => {
                self.sink.set_gauge(StreamMetric::RmsLevel, &self.url, db)
            }
            Observation::PeakLevel { db } => {
                self.sink.set_gauge(StreamMetric::PeakLevel, &self.url, db)
            }
            Observation::DynamicRange { db } => {
                self.sink.set_gauge(StreamMetric::DynamicRange, &self.url, db)
            }
            Observation::ClippedSamples { count } => {
                self.sink.add_counter(StreamMetric::ClippedSamples, &self.url, count)
            }
            Observation::SilenceStart | Observation::SilenceEnd { .. } => {}
        }
    }
}
