//! Distress scoring: per-fragment sentiment classification, high-confidence negative
//! filtering, and aggregation into a 0-100 percentage.

mod http;
mod lexicon;
mod model;
mod policy;

pub use http::HttpSentimentModel;
pub use lexicon::LexiconSentimentModel;
pub use model::{ModelError, SentimentLabel, SentimentModel, SentimentPrediction};
pub use policy::{
    ConfidenceThreshold, PolicyError, ScoringPolicy, UrgentCutoff, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_URGENT_CUTOFF,
};

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

/// Classifier output for a single fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentClassification {
    pub fragment: String,
    pub label: SentimentLabel,
    pub score: f64,
}

impl SentimentClassification {
    pub fn is_distress_signal(&self, threshold: ConfidenceThreshold) -> bool {
        self.label == SentimentLabel::Negative && threshold.admits(self.score)
    }
}

/// Keep only NEGATIVE results whose confidence meets the threshold.
pub fn detect_distress_signals(
    results: &[SentimentClassification],
    threshold: ConfidenceThreshold,
) -> Vec<&SentimentClassification> {
    results
        .iter()
        .filter(|result| result.is_distress_signal(threshold))
        .collect()
}

/// Share of distress signals among all fragments, as a percentage rounded to two decimals.
/// Zero fragments score 0.0.
pub fn calculate_distress_percentage<T>(total_fragments: usize, signals: &[T]) -> f64 {
    if total_fragments == 0 {
        return 0.0;
    }
    let ratio = signals.len().min(total_fragments) as f64 / total_fragments as f64;
    round_to_hundredths(ratio * 100.0)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of scoring one fragment sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistressAssessment {
    pub classifications: Vec<SentimentClassification>,
    pub signal_count: usize,
    pub percentage: f64,
}

/// Scorer holding the shared model handle and the default confidence threshold.
#[derive(Clone)]
pub struct DistressScorer {
    model: Arc<dyn SentimentModel>,
    threshold: ConfidenceThreshold,
}

impl DistressScorer {
    pub fn new(model: Arc<dyn SentimentModel>, threshold: ConfidenceThreshold) -> Self {
        Self { model, threshold }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn threshold(&self) -> ConfidenceThreshold {
        self.threshold
    }

    /// Distress percentage for the fragments at the configured threshold.
    pub async fn score(&self, fragments: &[String]) -> Result<f64, ModelError> {
        self.score_with_threshold(fragments, self.threshold).await
    }

    pub async fn score_with_threshold(
        &self,
        fragments: &[String],
        threshold: ConfidenceThreshold,
    ) -> Result<f64, ModelError> {
        Ok(self.assess(fragments, threshold).await?.percentage)
    }

    /// Full scoring trail: every classification, the signal count, and the percentage.
    pub async fn assess(
        &self,
        fragments: &[String],
        threshold: ConfidenceThreshold,
    ) -> Result<DistressAssessment, ModelError> {
        let classifications = self.classify(fragments).await?;
        let signals = detect_distress_signals(&classifications, threshold);
        let percentage = calculate_distress_percentage(classifications.len(), &signals);
        let signal_count = signals.len();

        Ok(DistressAssessment {
            classifications,
            signal_count,
            percentage,
        })
    }

    pub async fn classify(
        &self,
        fragments: &[String],
    ) -> Result<Vec<SentimentClassification>, ModelError> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let predictions = self.model.classify_batch(fragments).await?;
        if predictions.len() != fragments.len() {
            return Err(ModelError::CountMismatch {
                expected: fragments.len(),
                actual: predictions.len(),
            });
        }
        debug!(
            model = self.model.name(),
            fragments = fragments.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "classified fragments"
        );

        Ok(fragments
            .iter()
            .zip(predictions)
            .map(|(fragment, prediction)| SentimentClassification {
                fragment: fragment.clone(),
                label: prediction.label,
                score: prediction.score,
            })
            .collect())
    }
}

impl std::fmt::Debug for DistressScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistressScorer")
            .field("model", &self.model.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}
