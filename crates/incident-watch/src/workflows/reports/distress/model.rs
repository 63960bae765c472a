use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

/// Binary polarity emitted by the sentiment classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub const fn label(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Ok(SentimentLabel::Positive),
            "NEGATIVE" => Ok(SentimentLabel::Negative),
            _ => Err(ModelError::UnknownLabel(raw.to_string())),
        }
    }
}

/// Label and confidence for one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPrediction {
    pub label: SentimentLabel,
    pub score: f64,
}

impl SentimentPrediction {
    pub fn new(label: SentimentLabel, score: f64) -> Result<Self, ModelError> {
        if score.is_finite() && (0.0..=1.0).contains(&score) {
            Ok(Self { label, score })
        } else {
            Err(ModelError::InvalidScore(score))
        }
    }
}

/// Pretrained sentiment classifier. Implementations are loaded once and shared behind an
/// `Arc`; they must be deterministic for identical input.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, fragment: &str) -> Result<SentimentPrediction, ModelError>;

    /// Classify every fragment, returning predictions in input order. The default runs the
    /// single-fragment calls concurrently and fails on the first error.
    async fn classify_batch(
        &self,
        fragments: &[String],
    ) -> Result<Vec<SentimentPrediction>, ModelError> {
        try_join_all(fragments.iter().map(|fragment| self.classify(fragment))).await
    }
}

/// Failure to obtain a usable prediction. Never interpreted as "no distress".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("sentiment model unreachable: {0}")]
    Transport(String),
    #[error("sentiment model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("sentiment model response malformed: {0}")]
    MalformedResponse(String),
    #[error("sentiment model returned {actual} predictions for {expected} fragments")]
    CountMismatch { expected: usize, actual: usize },
    #[error("sentiment model returned unknown label '{0}'")]
    UnknownLabel(String),
    #[error("sentiment model returned out-of-range confidence {0}")]
    InvalidScore(f64),
    #[error("sentiment model failed: {0}")]
    Inference(String),
}
