use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::issues::models::{Report, ReportStatus};
use crate::features::issues::services::report_service::ReportService;

/// Owns the administrative status state machine and the resolution-record
/// invariants. All writes go through the report store so status and
/// resolution land in one transaction.
pub struct LifecycleService {
    reports: Arc<ReportService>,
}

/// Whether a transition is legal, given the locked row's current state.
///
/// Admins may move between submitted/progress/rejected freely and may skip
/// straight from submitted to a terminal status. The only hard walls:
/// completing without evidence, and leaving `complete` once a resolution has
/// been committed.
pub(crate) fn validate_transition(
    current: ReportStatus,
    has_resolution: bool,
    target: ReportStatus,
    evidence_image: Option<&str>,
    remarks: Option<&str>,
) -> Result<()> {
    if has_resolution && target != ReportStatus::Complete {
        return Err(AppError::InvalidStatus(format!(
            "report is {} with a committed resolution and cannot move to {}",
            current, target
        )));
    }

    if target == ReportStatus::Complete {
        let has_image = evidence_image.map(str::trim).is_some_and(|s| !s.is_empty());
        let has_remarks = remarks.map(str::trim).is_some_and(|s| !s.is_empty());

        if !has_image || !has_remarks {
            return Err(AppError::MissingResolutionEvidence(
                "completing a report requires an evidence image and remarks".to_string(),
            ));
        }
    }

    Ok(())
}

impl LifecycleService {
    pub fn new(reports: Arc<ReportService>) -> Self {
        Self { reports }
    }

    /// Move a report to `target`. Completions write the resolution record in
    /// the same transaction; repeated completions replace it (idempotent
    /// upsert). Any validation failure leaves the report untouched.
    pub async fn transition(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        evidence_image: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<Report> {
        let evidence = match target {
            ReportStatus::Complete => {
                let image = evidence_image.map(str::trim).filter(|s| !s.is_empty());
                let notes = remarks.map(str::trim).filter(|s| !s.is_empty());
                image.zip(notes)
            }
            _ => None,
        };

        let report = self
            .reports
            .apply_transition(report_id, target, evidence, |current, has_resolution| {
                validate_transition(current, has_resolution, target, evidence_image, remarks)
            })
            .await?;

        tracing::info!(
            report_id = %report.id,
            status = %report.status,
            "Report status updated"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_without_remarks_is_missing_evidence() {
        let err = validate_transition(
            ReportStatus::Submitted,
            false,
            ReportStatus::Complete,
            Some("after.jpg"),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::MissingResolutionEvidence(_)));
    }

    #[test]
    fn test_complete_with_blank_evidence_is_missing_evidence() {
        let err = validate_transition(
            ReportStatus::Progress,
            false,
            ReportStatus::Complete,
            Some("   "),
            Some("fixed"),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::MissingResolutionEvidence(_)));
    }

    #[test]
    fn test_submitted_may_complete_directly_with_evidence() {
        let result = validate_transition(
            ReportStatus::Submitted,
            false,
            ReportStatus::Complete,
            Some("after.jpg"),
            Some("fixed"),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_submitted_may_be_rejected_directly() {
        let result =
            validate_transition(ReportStatus::Submitted, false, ReportStatus::Rejected, None, None);

        assert!(result.is_ok());
    }

    #[test]
    fn test_progress_may_return_to_submitted() {
        let result =
            validate_transition(ReportStatus::Progress, false, ReportStatus::Submitted, None, None);

        assert!(result.is_ok());
    }

    #[test]
    fn test_resolved_complete_cannot_be_reopened() {
        let err = validate_transition(
            ReportStatus::Complete,
            true,
            ReportStatus::Progress,
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidStatus(_)));
    }

    #[test]
    fn test_repeated_complete_is_allowed_for_idempotent_upsert() {
        let result = validate_transition(
            ReportStatus::Complete,
            true,
            ReportStatus::Complete,
            Some("after-v2.jpg"),
            Some("re-verified on site"),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_rejected_may_be_reopened() {
        let result =
            validate_transition(ReportStatus::Rejected, false, ReportStatus::Progress, None, None);

        assert!(result.is_ok());
    }
}
