use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::issues::models::{Department, IssueCategory, Report, ReportStatus, ReportView};
use crate::features::issues::services::{SubmissionOutcome, SubmissionReceipt};

/// Coordinates extracted from the multipart submission form.
#[derive(Debug, Clone, Copy, Validate)]
pub struct SubmitIssueCoords {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionOutcomeDto {
    Created,
    Merged,
}

impl From<SubmissionOutcome> for SubmissionOutcomeDto {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Created => SubmissionOutcomeDto::Created,
            SubmissionOutcome::Merged => SubmissionOutcomeDto::Merged,
        }
    }
}

/// Response DTO for a processed submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitIssueResponseDto {
    pub outcome: SubmissionOutcomeDto,
    pub report_id: Uuid,
    /// Reference of the stored submission image
    pub image: String,
    pub description: String,
    pub category: IssueCategory,
    pub department: Department,
    pub count: i32,
}

impl SubmitIssueResponseDto {
    pub fn from_receipt(receipt: SubmissionReceipt, image: String) -> Self {
        Self {
            outcome: receipt.outcome.into(),
            report_id: receipt.report_id,
            image,
            description: receipt.description,
            category: receipt.category,
            department: receipt.department,
            count: receipt.count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IssueListFilter {
    All,
    User,
}

/// Query parameters for listing issues
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListIssuesQuery {
    /// Restrict to a single lifecycle status
    pub status: Option<ReportStatus>,
    /// `user` restricts to reports the caller contributed to
    pub filter: Option<IssueListFilter>,
}

/// Resolution record, present only for completed reports
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolutionDto {
    pub date_of_resolution: DateTime<Utc>,
    pub image: String,
    pub remarks: String,
}

/// Aggregate view of one report. Contributing user identifiers are
/// deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportViewDto {
    pub id: Uuid,
    pub date_of_report: DateTime<Utc>,
    pub category: IssueCategory,
    pub department: Department,
    pub description: String,
    pub count: i32,
    pub status: ReportStatus,
    pub lat: f64,
    pub lon: f64,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolutionDto>,
}

impl From<ReportView> for ReportViewDto {
    fn from(view: ReportView) -> Self {
        Self {
            id: view.id,
            date_of_report: view.date_of_report,
            category: view.category,
            department: view.department,
            description: view.description,
            count: view.count,
            status: view.status,
            lat: view.lat,
            lon: view.lon,
            images: view.images,
            resolved: view.resolution.map(|r| ResolutionDto {
                date_of_resolution: r.resolved_at,
                image: r.image_name,
                remarks: r.remarks,
            }),
        }
    }
}

/// Request body for an administrative status change
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateIssueStatusDto {
    pub status: ReportStatus,
    /// Required when status is `complete`
    pub evidence_image: Option<String>,
    /// Required when status is `complete`
    pub remarks: Option<String>,
}

/// Response DTO for a report without its submissions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportDto {
    pub id: Uuid,
    pub date_of_report: DateTime<Utc>,
    pub category: IssueCategory,
    pub department: Department,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub count: i32,
    pub status: ReportStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            date_of_report: r.created_at,
            category: r.category,
            department: r.department,
            description: r.description,
            lat: r.lat,
            lon: r.lon,
            count: r.count,
            status: r.status,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_latitude_fails_validation() {
        let coords = SubmitIssueCoords {
            lat: 91.2,
            lon: 77.6,
        };

        assert!(coords.validate().is_err());
    }

    #[test]
    fn test_valid_coordinates_pass_validation() {
        let coords = SubmitIssueCoords {
            lat: 12.9716,
            lon: 77.5946,
        };

        assert!(coords.validate().is_ok());
    }

    #[test]
    fn test_report_view_without_resolution_omits_resolved_field() {
        let view = ReportView {
            id: Uuid::from_u128(1),
            category: IssueCategory::Pothole,
            department: Department::RoadConstruction,
            description: "Pothole at the junction".to_string(),
            lat: 12.9,
            lon: 77.6,
            count: 2,
            status: ReportStatus::Progress,
            date_of_report: Utc::now(),
            images: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            resolution: None,
        };

        let json = serde_json::to_value(ReportViewDto::from(view)).unwrap();

        assert!(json.get("resolved").is_none());
        assert_eq!(json["images"].as_array().unwrap().len(), 2);
        // The projection never carries contributing user identifiers
        assert!(json.get("users").is_none());
    }
}
