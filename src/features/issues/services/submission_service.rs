use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::Result;
use crate::features::issues::models::{Department, IssueCategory, NewReport};
use crate::features::issues::services::cell_lock::SpatialCellLocks;
use crate::features::issues::services::classifier::ImagePayload;
use crate::features::issues::services::matcher_service::{DuplicateMatcher, MatchDecision};
use crate::features::issues::services::report_service::ReportService;

/// How a submission was folded into the report set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Created,
    Merged,
}

/// What the citizen gets back: the canonical report the submission now
/// belongs to, with its classification and updated count.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub outcome: SubmissionOutcome,
    pub report_id: Uuid,
    pub description: String,
    pub category: IssueCategory,
    pub department: Department,
    pub count: i32,
}

/// The submitIssue operation: resolve against open reports, then commit,
/// holding the point's cell lock across both steps so concurrent submissions
/// for the same spot cannot double-create.
pub struct SubmissionService {
    matcher: DuplicateMatcher,
    reports: Arc<ReportService>,
    locks: SpatialCellLocks,
}

impl SubmissionService {
    pub fn new(
        matcher: DuplicateMatcher,
        reports: Arc<ReportService>,
        locks: SpatialCellLocks,
    ) -> Self {
        Self {
            matcher,
            reports,
            locks,
        }
    }

    pub async fn submit(
        &self,
        user_id: &str,
        lat: f64,
        lon: f64,
        image: &ImagePayload,
        image_name: &str,
    ) -> Result<SubmissionReceipt> {
        // Nothing below mutates the store until the oracle has answered; a
        // classification failure leaves no trace.
        let _cell = self.locks.acquire(lat, lon).await;

        match self.matcher.resolve(lat, lon, image).await? {
            MatchDecision::Create(classification) => {
                let report = self
                    .reports
                    .create_with_submission(
                        &NewReport {
                            category: classification.category,
                            department: classification.department,
                            description: classification.description,
                            lat,
                            lon,
                        },
                        user_id,
                        image_name,
                    )
                    .await?;

                Ok(SubmissionReceipt {
                    outcome: SubmissionOutcome::Created,
                    report_id: report.id,
                    description: report.description,
                    category: report.category,
                    department: report.department,
                    count: report.count,
                })
            }
            MatchDecision::Merge {
                report_id,
                description,
                category,
                department,
            } => {
                let count = self
                    .reports
                    .merge_submission(report_id, user_id, image_name)
                    .await?;

                Ok(SubmissionReceipt {
                    outcome: SubmissionOutcome::Merged,
                    report_id,
                    description,
                    category,
                    department,
                    count,
                })
            }
        }
    }
}
