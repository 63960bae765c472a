use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const INCIDENT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const SUBMISSION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MAX_LOCATION_LEN: usize = 100;
pub const MAX_INCIDENT_TYPE_LEN: usize = 50;
pub const MAX_WITNESS_LEN: usize = 50;

/// Identifier assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub i64);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category chosen by the reporter. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentType {
    Physical,
    Sexual,
    Emotional,
    Economic,
    Other(String),
}

impl IncidentType {
    pub fn label(&self) -> &str {
        match self {
            IncidentType::Physical => "Physical",
            IncidentType::Sexual => "Sexual",
            IncidentType::Emotional => "Emotional",
            IncidentType::Economic => "Economic",
            IncidentType::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for IncidentType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "physical" => IncidentType::Physical,
            "sexual" => IncidentType::Sexual,
            "emotional" => IncidentType::Emotional,
            "economic" => IncidentType::Economic,
            _ => IncidentType::Other(value.trim().to_string()),
        }
    }
}

impl From<IncidentType> for String {
    fn from(value: IncidentType) -> Self {
        match value {
            IncidentType::Other(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

/// Review status shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Urgent,
    Reviewed,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Urgent => "Urgent",
            ReportStatus::Reviewed => "Reviewed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(ReportStatus::Pending),
            "Urgent" => Some(ReportStatus::Urgent),
            "Reviewed" => Some(ReportStatus::Reviewed),
            _ => None,
        }
    }
}

/// Progress of the background distress scoring for a single report.
///
/// `Pending -> Scoring -> Scored | Failed`. A failed or never-started report can be
/// dispatched again; a scored report is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringState {
    Pending,
    Scoring,
    Scored,
    Failed,
}

impl ScoringState {
    pub const fn label(self) -> &'static str {
        match self {
            ScoringState::Pending => "pending",
            ScoringState::Scoring => "scoring",
            ScoringState::Scored => "scored",
            ScoringState::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ScoringState::Pending),
            "scoring" => Some(ScoringState::Scoring),
            "scored" => Some(ScoringState::Scored),
            "failed" => Some(ScoringState::Failed),
            _ => None,
        }
    }

    pub const fn can_dispatch(self) -> bool {
        matches!(self, ScoringState::Pending | ScoringState::Failed)
    }
}

/// Raw intake payload as typed by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub incident_date: NaiveDate,
    pub location: String,
    pub incident_type: IncidentType,
    pub description: String,
    pub witness: String,
}

/// Validated report ready to be inserted; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub incident_date: NaiveDate,
    pub location: String,
    pub incident_type: IncidentType,
    pub description: Vec<String>,
    pub witness: String,
    pub submitted_at: NaiveDateTime,
    pub status: ReportStatus,
    pub distress_percentage: f64,
    pub scoring_state: ScoringState,
}

/// Persisted incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub incident_date: NaiveDate,
    pub location: String,
    pub incident_type: IncidentType,
    pub description: Vec<String>,
    pub witness: String,
    pub submitted_at: NaiveDateTime,
    pub status: ReportStatus,
    pub distress_percentage: f64,
    pub scoring_state: ScoringState,
    pub scoring_error: Option<String>,
}

impl Report {
    pub fn from_new(id: ReportId, report: NewReport) -> Self {
        Self {
            id,
            incident_date: report.incident_date,
            location: report.location,
            incident_type: report.incident_type,
            description: report.description,
            witness: report.witness,
            submitted_at: report.submitted_at,
            status: report.status,
            distress_percentage: report.distress_percentage,
            scoring_state: report.scoring_state,
            scoring_error: None,
        }
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        ReportSnapshot {
            report_id: self.id,
            incident_date: self.incident_date.format(INCIDENT_DATE_FORMAT).to_string(),
            location: self.location.clone(),
            incident_type: self.incident_type.label().to_string(),
            description: self.description.clone(),
            witness: self.witness.clone(),
            submission_date: self.submitted_at.format(SUBMISSION_TIME_FORMAT).to_string(),
            status: self.status.label(),
            distress_percentage: self.distress_percentage,
            scoring_state: self.scoring_state.label(),
            scoring_error: self.scoring_error.clone(),
        }
    }
}

/// Wire representation used by the HTTP API and by push notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub report_id: ReportId,
    pub incident_date: String,
    pub location: String,
    pub incident_type: String,
    pub description: Vec<String>,
    pub witness: String,
    pub submission_date: String,
    pub status: &'static str,
    pub distress_percentage: f64,
    pub scoring_state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_error: Option<String>,
}
