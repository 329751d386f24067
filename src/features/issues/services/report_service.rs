use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::issues::models::{
    Department, IssueCategory, NewReport, Report, ReportStatus, ReportView, Resolution, Submission,
};

/// Owns report and submission rows. Every mutation couples the count change
/// with the submission insert in one transaction, so count always equals the
/// number of submission rows for the report.
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a report and its first submission as one committed unit.
    pub async fn create_with_submission(
        &self,
        data: &NewReport,
        user_id: &str,
        image_name: &str,
    ) -> Result<Report> {
        let mut tx = self.pool.begin().await.map_err(AppError::store)?;

        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (category, department, description, lat, lon)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, category, department, description, lat, lon,
                      count, status, created_at, updated_at
            "#,
        )
        .bind(data.category)
        .bind(data.department)
        .bind(&data.description)
        .bind(data.lat)
        .bind(data.lon)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::store)?;

        let submission = Self::attach_submission(&mut tx, report.id, user_id, image_name).await?;

        tx.commit().await.map_err(AppError::store)?;

        tracing::info!(
            report_id = %report.id,
            submission_id = %submission.id,
            category = %report.category,
            "Created report"
        );

        Ok(report)
    }

    /// Fold a submission into an existing report: increment count and attach
    /// the submission together, or not at all. The UPDATE takes the row lock,
    /// so concurrent merges serialize and no increment is lost. Returns the
    /// new count.
    pub async fn merge_submission(
        &self,
        report_id: Uuid,
        user_id: &str,
        image_name: &str,
    ) -> Result<i32> {
        let mut tx = self.pool.begin().await.map_err(AppError::store)?;

        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE reports
            SET count = count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING count
            "#,
        )
        .bind(report_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::store)?;

        let count = count.ok_or(AppError::ReportNotFound(report_id))?;

        let submission = Self::attach_submission(&mut tx, report_id, user_id, image_name).await?;

        tx.commit().await.map_err(AppError::store)?;

        tracing::info!(
            report_id = %report_id,
            submission_id = %submission.id,
            count,
            "Merged submission into report"
        );

        Ok(count)
    }

    async fn attach_submission(
        tx: &mut Transaction<'_, Postgres>,
        report_id: Uuid,
        user_id: &str,
        image_name: &str,
    ) -> Result<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (report_id, user_id, image_name)
            VALUES ($1, $2, $3)
            RETURNING id, report_id, user_id, image_name, created_at
            "#,
        )
        .bind(report_id)
        .bind(user_id)
        .bind(image_name)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::store)
    }

    /// Apply an administrative status change as one committed unit: status
    /// update plus, for completions, the resolution upsert. `guard` runs with
    /// the report row locked and decides whether the transition is legal;
    /// lifecycle rules live with the caller, atomicity lives here.
    pub async fn apply_transition<F>(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        resolution: Option<(&str, &str)>,
        guard: F,
    ) -> Result<Report>
    where
        F: FnOnce(ReportStatus, bool) -> Result<()> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(AppError::store)?;

        let current = sqlx::query_as::<_, StatusRow>(
            r#"
            SELECT r.status AS status,
                   (res.report_id IS NOT NULL) AS has_resolution
            FROM reports r
            LEFT JOIN resolutions res ON res.report_id = r.id
            WHERE r.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(report_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::store)?
        .ok_or(AppError::ReportNotFound(report_id))?;

        guard(current.status, current.has_resolution)?;

        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, category, department, description, lat, lon,
                      count, status, created_at, updated_at
            "#,
        )
        .bind(report_id)
        .bind(target)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::store)?;

        if let Some((image_name, remarks)) = resolution {
            // Idempotent by report id: repeated completions replace the
            // record instead of stacking rows.
            sqlx::query(
                r#"
                INSERT INTO resolutions (report_id, resolved_at, image_name, remarks)
                VALUES ($1, NOW(), $2, $3)
                ON CONFLICT (report_id) DO UPDATE
                SET resolved_at = EXCLUDED.resolved_at,
                    image_name = EXCLUDED.image_name,
                    remarks = EXCLUDED.remarks
                "#,
            )
            .bind(report_id)
            .bind(image_name)
            .bind(remarks)
            .execute(&mut *tx)
            .await
            .map_err(AppError::store)?;
        }

        tx.commit().await.map_err(AppError::store)?;

        Ok(report)
    }

    /// Aggregate view: report joined with its submission images and, when the
    /// report has been completed, its resolution record. `contributor`
    /// filters by membership only; user ids are never part of the projection.
    pub async fn list_views(
        &self,
        status: Option<ReportStatus>,
        contributor: Option<&str>,
    ) -> Result<Vec<ReportView>> {
        let rows = sqlx::query_as::<_, ReportViewRow>(
            r#"
            SELECT r.id, r.category, r.department, r.description, r.lat, r.lon,
                   r.count, r.status, r.created_at,
                   ARRAY(
                       SELECT s.image_name FROM submissions s
                       WHERE s.report_id = r.id
                   ) AS images,
                   res.resolved_at AS resolved_at,
                   res.image_name AS resolution_image,
                   res.remarks AS resolution_remarks
            FROM reports r
            LEFT JOIN resolutions res ON res.report_id = r.id
            WHERE ($1::report_status IS NULL OR r.status = $1)
            AND ($2::text IS NULL OR EXISTS (
                SELECT 1 FROM submissions s
                WHERE s.report_id = r.id AND s.user_id = $2
            ))
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(status)
        .bind(contributor)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::store)?;

        Ok(rows.into_iter().map(ReportViewRow::into_view).collect())
    }
}

#[derive(Debug, FromRow)]
struct StatusRow {
    status: ReportStatus,
    has_resolution: bool,
}

#[derive(Debug, FromRow)]
struct ReportViewRow {
    id: Uuid,
    category: IssueCategory,
    department: Department,
    description: String,
    lat: f64,
    lon: f64,
    count: i32,
    status: ReportStatus,
    created_at: DateTime<Utc>,
    images: Vec<String>,
    resolved_at: Option<DateTime<Utc>>,
    resolution_image: Option<String>,
    resolution_remarks: Option<String>,
}

impl ReportViewRow {
    fn into_view(self) -> ReportView {
        let resolution = match (self.resolved_at, self.resolution_image, self.resolution_remarks)
        {
            (Some(resolved_at), Some(image_name), Some(remarks)) => Some(Resolution {
                report_id: self.id,
                resolved_at,
                image_name,
                remarks,
            }),
            _ => None,
        };

        ReportView {
            id: self.id,
            category: self.category,
            department: self.department,
            description: self.description,
            lat: self.lat,
            lon: self.lon,
            count: self.count,
            status: self.status,
            date_of_report: self.created_at,
            images: self.images,
            resolution,
        }
    }
}
