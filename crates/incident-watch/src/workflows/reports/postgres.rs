use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::distress::UrgentCutoff;
use super::domain::{IncidentType, NewReport, Report, ReportId, ReportStatus, ScoringState};
use super::repository::{ReportStore, ScoringClaim, StoreError};

const REPORT_COLUMNS: &str = "report_id, incident_date, location, incident_type, description, \
     witness, submission_date, status, distress_percentage, scoring_state, scoring_error";

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Postgres-backed store. The description is kept as a JSON array of fragments.
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(unavailable)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn report_from_row(row: &PgRow) -> Result<Report, StoreError> {
    let id: i64 = row.try_get("report_id").map_err(unavailable)?;
    let corrupt = |detail: String| StoreError::Corrupt { id, detail };

    let incident_date: NaiveDate = row.try_get("incident_date").map_err(unavailable)?;
    let location: String = row.try_get("location").map_err(unavailable)?;
    let incident_type: String = row.try_get("incident_type").map_err(unavailable)?;
    let description: String = row.try_get("description").map_err(unavailable)?;
    let witness: String = row.try_get("witness").map_err(unavailable)?;
    let submitted_at: NaiveDateTime = row.try_get("submission_date").map_err(unavailable)?;
    let status: String = row.try_get("status").map_err(unavailable)?;
    let distress_percentage: f64 = row.try_get("distress_percentage").map_err(unavailable)?;
    let scoring_state: String = row.try_get("scoring_state").map_err(unavailable)?;
    let scoring_error: Option<String> = row.try_get("scoring_error").map_err(unavailable)?;

    let description: Vec<String> = serde_json::from_str(&description)
        .map_err(|err| corrupt(format!("description is not a JSON list: {err}")))?;
    let status = ReportStatus::parse(&status)
        .ok_or_else(|| corrupt(format!("unknown status '{status}'")))?;
    let scoring_state = ScoringState::parse(&scoring_state)
        .ok_or_else(|| corrupt(format!("unknown scoring state '{scoring_state}'")))?;

    Ok(Report {
        id: ReportId(id),
        incident_date,
        location,
        incident_type: IncidentType::from(incident_type),
        description,
        witness,
        submitted_at,
        status,
        distress_percentage,
        scoring_state,
        scoring_error,
    })
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn insert(&self, report: NewReport) -> Result<Report, StoreError> {
        let description = serde_json::to_string(&report.description).map_err(unavailable)?;
        let query = format!(
            "INSERT INTO reports (incident_date, location, incident_type, description, witness, \
             submission_date, status, distress_percentage, scoring_state) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {REPORT_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(report.incident_date)
            .bind(&report.location)
            .bind(report.incident_type.label())
            .bind(description)
            .bind(&report.witness)
            .bind(report.submitted_at)
            .bind(report.status.label())
            .bind(report.distress_percentage)
            .bind(report.scoring_state.label())
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;

        report_from_row(&row)
    }

    async fn fetch(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        let query = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE report_id = $1");
        let row = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(report_from_row).transpose()
    }

    async fn set_scoring_state(
        &self,
        id: ReportId,
        state: ScoringState,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE reports SET scoring_state = $1, scoring_error = $2 WHERE report_id = $3",
        )
        .bind(state.label())
        .bind(error)
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn claim_scoring(&self, id: ReportId) -> Result<ScoringClaim, StoreError> {
        let query = format!(
            "UPDATE reports SET scoring_state = $1, scoring_error = NULL \
             WHERE report_id = $2 AND scoring_state IN ($3, $4) RETURNING {REPORT_COLUMNS}"
        );
        let claimed = sqlx::query(&query)
            .bind(ScoringState::Scoring.label())
            .bind(id.0)
            .bind(ScoringState::Pending.label())
            .bind(ScoringState::Failed.label())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        match claimed {
            Some(row) => Ok(ScoringClaim::Claimed(report_from_row(&row)?)),
            None => {
                let current = self.fetch(id).await?.ok_or(StoreError::NotFound(id))?;
                Ok(ScoringClaim::Refused(current.scoring_state))
            }
        }
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE reports SET scoring_state = $1, scoring_error = $2 WHERE scoring_state = $3",
        )
        .bind(ScoringState::Failed.label())
        .bind(message)
        .bind(ScoringState::Scoring.label())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }

    async fn record_score(
        &self,
        id: ReportId,
        distress_percentage: f64,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        let query = format!(
            "UPDATE reports SET distress_percentage = $1, status = $2, scoring_state = $3, \
             scoring_error = NULL WHERE report_id = $4 RETURNING {REPORT_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(distress_percentage)
            .bind(status.label())
            .bind(ScoringState::Scored.label())
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?
            .ok_or(StoreError::NotFound(id))?;

        report_from_row(&row)
    }

    async fn list_ranked(&self) -> Result<Vec<Report>, StoreError> {
        let query = format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             ORDER BY distress_percentage DESC, submission_date DESC"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter().map(report_from_row).collect()
    }

    async fn recompute_statuses(&self, cutoff: UrgentCutoff) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = CASE
                WHEN distress_percentage > $1 THEN 'Urgent'
                WHEN status = 'Reviewed' THEN 'Reviewed'
                ELSE 'Pending'
            END
            WHERE status IS DISTINCT FROM CASE
                WHEN distress_percentage > $1 THEN 'Urgent'
                WHEN status = 'Reviewed' THEN 'Reviewed'
                ELSE 'Pending'
            END
            "#,
        )
        .bind(cutoff.value())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_upgrade_tables_without_scoring_columns() {
        let upgrade = MIGRATOR
            .iter()
            .find(|migration| migration.version == 2)
            .expect("scoring column migration");

        for column in ["scoring_state", "scoring_error"] {
            assert!(
                upgrade
                    .sql
                    .contains(&format!("ADD COLUMN IF NOT EXISTS {column}")),
                "missing upgrade for {column}"
            );
        }
    }

    #[test]
    fn every_selected_column_exists_after_migrations() {
        let schema: String = MIGRATOR
            .iter()
            .map(|migration| migration.sql.as_ref())
            .collect::<Vec<_>>()
            .join("\n");

        for column in REPORT_COLUMNS.split(',').map(str::trim) {
            assert!(schema.contains(column), "no migration defines {column}");
        }
    }
}
