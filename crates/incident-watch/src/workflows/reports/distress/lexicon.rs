//! Offline fallback classifier used when no inference endpoint is configured.

use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;

use super::model::{ModelError, SentimentLabel, SentimentModel, SentimentPrediction};

const DISTRESS_TERMS: &[&str] = &[
    "abuse", "abused", "afraid", "alone", "angry", "anxious", "assaulted", "attacked", "awful",
    "bad", "beat", "bleeding", "bruised", "can't", "choked", "cried", "crying", "danger",
    "depressed", "distress", "distressed", "exhausted", "fear", "forced", "groped", "harassed",
    "hate", "helpless", "hit", "hopeless", "horrible", "humiliated", "hurt", "injured",
    "insulted", "kicked", "mocked", "pain", "panic", "punched", "pushed", "raped", "robbed",
    "sad", "scared", "screamed", "shaken", "shoved", "slapped", "stalked", "stalking", "stole",
    "stressed", "suicidal", "terrible", "terrified", "threatened", "threats", "trapped",
    "unsafe", "upset", "violent", "worst", "worthless", "yelled",
];

const COMFORT_TERMS: &[&str] = &[
    "better", "calm", "comfortable", "fine", "glad", "good", "great", "happy", "helpful",
    "kind", "love", "nice", "okay", "peaceful", "relieved", "respectful", "safe", "supported",
    "supportive", "thankful", "wonderful",
];

/// Whole-word vocabulary matcher. Confidence grows with the margin between distress and
/// comfort hits; text with no hits is weakly positive.
pub struct LexiconSentimentModel {
    distress: AhoCorasick,
    comfort: AhoCorasick,
}

impl LexiconSentimentModel {
    pub fn new() -> Result<Self, ModelError> {
        Ok(Self {
            distress: build_matcher(DISTRESS_TERMS)?,
            comfort: build_matcher(COMFORT_TERMS)?,
        })
    }

    fn predict(&self, text: &str) -> Result<SentimentPrediction, ModelError> {
        let distress_hits = count_whole_words(&self.distress, text) as f64;
        let comfort_hits = count_whole_words(&self.comfort, text) as f64;
        let total = distress_hits + comfort_hits;

        if total == 0.0 {
            return SentimentPrediction::new(SentimentLabel::Positive, 0.5);
        }

        let margin = (distress_hits - comfort_hits).abs() / total;
        let confidence = 0.5 + margin / 2.0;
        let label = if distress_hits > comfort_hits {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        };
        SentimentPrediction::new(label, confidence)
    }
}

fn build_matcher(terms: &[&str]) -> Result<AhoCorasick, ModelError> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(terms)
        .map_err(|err| ModelError::Inference(format!("failed to build lexicon matcher: {err}")))
}

fn count_whole_words(matcher: &AhoCorasick, text: &str) -> usize {
    let is_word = |c: char| c.is_alphanumeric() || c == '\'';
    matcher
        .find_iter(text)
        .filter(|found| {
            let before = text[..found.start()].chars().next_back();
            let after = text[found.end()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .count()
}

#[async_trait]
impl SentimentModel for LexiconSentimentModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, fragment: &str) -> Result<SentimentPrediction, ModelError> {
        self.predict(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LexiconSentimentModel {
        LexiconSentimentModel::new().expect("lexicon builds")
    }

    #[test]
    fn distress_only_text_is_confidently_negative() {
        let prediction = model().predict("I was hurt and I am scared").expect("predicts");
        assert_eq!(prediction.label, SentimentLabel::Negative);
        assert_eq!(prediction.score, 1.0);
    }

    #[test]
    fn comfort_text_is_positive() {
        let prediction = model().predict("The staff were supportive and kind").expect("predicts");
        assert_eq!(prediction.label, SentimentLabel::Positive);
        assert_eq!(prediction.score, 1.0);
    }

    #[test]
    fn mixed_text_has_reduced_confidence() {
        let prediction = model()
            .predict("I was hurt and scared but the nurse was kind")
            .expect("predicts");
        assert_eq!(prediction.label, SentimentLabel::Negative);
        assert!(prediction.score < 0.9);
    }

    #[test]
    fn matches_whole_words_only() {
        let prediction = model().predict("White shirts hitting the shelves").expect("predicts");
        assert_eq!(prediction.label, SentimentLabel::Positive);
        assert_eq!(prediction.score, 0.5);
    }

    #[test]
    fn unsafe_is_not_read_as_safe() {
        let prediction = model().predict("I feel unsafe").expect("predicts");
        assert_eq!(prediction.label, SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let fragments = vec!["I am terrified".to_string(), "It was a nice day".to_string()];
        let predictions = model().classify_batch(&fragments).await.expect("classifies");
        assert_eq!(predictions[0].label, SentimentLabel::Negative);
        assert_eq!(predictions[1].label, SentimentLabel::Positive);
    }
}
