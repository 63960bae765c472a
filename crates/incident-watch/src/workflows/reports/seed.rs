use chrono::{NaiveDate, NaiveDateTime};

use super::domain::{IncidentType, NewReport, ReportStatus, ScoringState};
use super::repository::{ReportStore, StoreError};

type SampleRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static [&'static str],
    &'static str,
    &'static str,
    ReportStatus,
    f64,
);

#[rustfmt::skip]
const SAMPLE_ROWS: &[SampleRow] = &[
    ("2025-02-01", "Office Break Room", "Emotional", &["John made rude comments", "I felt humiliated"], "Victim", "2025-03-01 08:15:23", ReportStatus::Pending, 60.0),
    ("2025-02-02", "Home", "Physical", &["My partner hit me", "I'm scared for my life"], "Victim", "2025-03-01 09:30:45", ReportStatus::Reviewed, 90.0),
    ("2025-02-03", "Counseling Center", "Emotional", &["Session was helpful", "Staff were supportive"], "Victim", "2025-03-01 10:45:12", ReportStatus::Pending, 20.0),
    ("2025-02-04", "Work Desk", "Sexual", &["Jane harassed me", "She threatened me after rejection"], "Victim", "2025-03-01 11:20:33", ReportStatus::Pending, 85.0),
    ("2025-02-05", "Outside House", "Emotional", &["Ex-husband was stalking", "I'm terrified"], "Victim", "2025-03-01 12:10:56", ReportStatus::Pending, 75.0),
    ("2025-02-06", "Helpline Call", "Economic", &["I called today", "Need help with complaint"], "Victim", "2025-03-01 13:25:17", ReportStatus::Pending, 30.0),
    ("2025-02-07", "Park", "Physical", &["Someone pushed me", "It hurt a lot"], "Witness", "2025-03-01 14:40:28", ReportStatus::Pending, 70.0),
    ("2025-02-08", "Office", "Emotional", &["Boss yelled at me", "I felt worthless"], "Victim", "2025-03-01 15:55:39", ReportStatus::Pending, 65.0),
    ("2025-02-10", "Street", "Economic", &["Lost my wallet", "Someone threatened me"], "Victim", "2025-03-01 17:25:01", ReportStatus::Pending, 50.0),
    ("2025-02-12", "Apartment", "Physical", &["Neighbor attacked me", "I need urgent help"], "Victim", "2025-03-01 19:55:23", ReportStatus::Pending, 80.0),
    ("2025-02-15", "Home", "Economic", &["Partner took my money", "I can't leave"], "Victim", "2025-03-01 22:40:56", ReportStatus::Pending, 45.0),
    ("2025-02-17", "Street", "Emotional", &["Stranger yelled at me", "I'm upset"], "Witness", "2025-03-02 09:30:18", ReportStatus::Pending, 40.0),
    ("2025-02-22", "Home", "Emotional", &["Family argued", "I'm exhausted"], "Victim", "2025-03-02 15:05:13", ReportStatus::Pending, 45.0),
    ("2025-03-02", "Outside", "Economic", &["Robbed on street", "I'm shaken"], "Victim", "2025-03-03 09:30:41", ReportStatus::Pending, 60.0),
];

/// Realistic, already-scored reports for demos and local development.
pub fn sample_reports() -> Result<Vec<NewReport>, chrono::ParseError> {
    SAMPLE_ROWS.iter().map(sample_report).collect()
}

fn sample_report(row: &SampleRow) -> Result<NewReport, chrono::ParseError> {
    let &(incident_date, location, incident_type, description, witness, submitted, status, distress) =
        row;

    Ok(NewReport {
        incident_date: NaiveDate::parse_from_str(incident_date, "%Y-%m-%d")?,
        location: location.to_string(),
        incident_type: IncidentType::from(incident_type.to_string()),
        description: description.iter().map(|s| s.to_string()).collect(),
        witness: witness.to_string(),
        submitted_at: NaiveDateTime::parse_from_str(submitted, "%Y-%m-%d %H:%M:%S")?,
        status,
        distress_percentage: distress,
        scoring_state: ScoringState::Scored,
    })
}

/// Insert the sample reports, returning how many rows were written.
pub async fn seed_store<S: ReportStore + ?Sized>(store: &S) -> Result<usize, StoreError> {
    let reports = sample_reports()
        .map_err(|err| StoreError::Unavailable(format!("invalid sample data: {err}")))?;
    let count = reports.len();
    for report in reports {
        store.insert(report).await?;
    }
    Ok(count)
}
