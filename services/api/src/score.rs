use crate::infra::sentiment_model;
use clap::Args;
use incident_watch::config::AppConfig;
use incident_watch::error::AppError;
use incident_watch::workflows::reports::{
    segment_narrative, ConfidenceThreshold, DistressAssessment, DistressScorer, UrgentCutoff,
};
use std::fmt;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Narrative to segment and score
    #[arg(long)]
    pub(crate) text: String,
    /// Override the configured confidence threshold (0.0 - 1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub(crate) threshold: Option<ConfidenceThreshold>,
}

fn parse_threshold(raw: &str) -> Result<ConfidenceThreshold, String> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("failed to parse '{raw}' as a number ({err})"))?;
    ConfidenceThreshold::new(value).map_err(|err| err.to_string())
}

pub(crate) async fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let threshold = args
        .threshold
        .unwrap_or(config.scoring.confidence_threshold);

    let scorer = DistressScorer::new(sentiment_model(&config.model)?, threshold);
    let fragments = segment_narrative(&args.text);
    let assessment = scorer.assess(&fragments, threshold).await?;

    print!(
        "{}",
        AssessmentReport {
            model: scorer.model_name(),
            assessment: &assessment,
            threshold,
            cutoff: config.scoring.urgent_cutoff,
        }
    );
    Ok(())
}

/// Plain-text rendering of one assessment for the terminal.
struct AssessmentReport<'a> {
    model: &'a str,
    assessment: &'a DistressAssessment,
    threshold: ConfidenceThreshold,
    cutoff: UrgentCutoff,
}

impl fmt::Display for AssessmentReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assessment = self.assessment;
        writeln!(f, "Distress assessment ({} model)", self.model)?;
        if assessment.classifications.is_empty() {
            writeln!(f, "  No sentences found in the narrative")?;
        }
        for (index, result) in assessment.classifications.iter().enumerate() {
            let marker = if result.is_distress_signal(self.threshold) {
                "!"
            } else {
                " "
            };
            writeln!(
                f,
                "{marker} {:>2}. {:<8} {:.4}  {}",
                index + 1,
                result.label.label(),
                result.score,
                result.fragment
            )?;
        }
        writeln!(
            f,
            "Signals: {} of {} (threshold {:.2})",
            assessment.signal_count,
            assessment.classifications.len(),
            self.threshold.value()
        )?;
        writeln!(
            f,
            "Distress: {:.2}% -> {}",
            assessment.percentage,
            self.cutoff.status_for(assessment.percentage).label()
        )
    }
}
