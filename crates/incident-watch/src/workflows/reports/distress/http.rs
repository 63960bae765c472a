use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{ModelError, SentimentLabel, SentimentModel, SentimentPrediction};

/// Client for a hosted text-classification endpoint speaking the Hugging Face inference
/// format, e.g. `distilbert-base-uncased-finetuned-sst-2-english`.
pub struct HttpSentimentModel {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Ranked(Vec<Vec<RawPrediction>>),
    Flat(Vec<RawPrediction>),
}

impl HttpSentimentModel {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, ModelError> {
        // Inference itself is unbounded; only connection setup is limited.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, fragment: &str) -> Result<SentimentPrediction, ModelError> {
        let mut predictions = self.classify_batch(&[fragment.to_string()]).await?;
        predictions.pop().ok_or(ModelError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    async fn classify_batch(
        &self,
        fragments: &[String],
    ) -> Result<Vec<SentimentPrediction>, ModelError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&InferenceRequest { inputs: fragments });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        debug!(endpoint = %self.endpoint, bytes = body.len(), "inference response received");
        parse_predictions(&body, fragments.len())
    }
}

/// Decode an inference response body into one prediction per input, in order.
pub(crate) fn parse_predictions(
    body: &[u8],
    expected: usize,
) -> Result<Vec<SentimentPrediction>, ModelError> {
    let response: InferenceResponse = serde_json::from_slice(body)
        .map_err(|err| ModelError::MalformedResponse(err.to_string()))?;

    let raw: Vec<RawPrediction> = match response {
        InferenceResponse::Flat(predictions) => predictions,
        InferenceResponse::Ranked(candidates) => candidates
            .into_iter()
            .map(|options| {
                options
                    .into_iter()
                    .max_by(|left, right| left.score.total_cmp(&right.score))
                    .ok_or_else(|| {
                        ModelError::MalformedResponse("empty candidate list".to_string())
                    })
            })
            .collect::<Result<_, _>>()?,
    };

    if raw.len() != expected {
        return Err(ModelError::CountMismatch {
            expected,
            actual: raw.len(),
        });
    }

    raw.into_iter()
        .map(|prediction| {
            let label = SentimentLabel::parse(&prediction.label)?;
            SentimentPrediction::new(label, prediction.score)
        })
        .collect()
}
