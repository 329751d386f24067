use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Submitted,
    Progress,
    Complete,
    Rejected,
}

impl ReportStatus {
    /// Open reports are merge targets; complete/rejected never are.
    #[allow(dead_code)]
    pub fn is_open(self) -> bool {
        matches!(self, ReportStatus::Submitted | ReportStatus::Progress)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Submitted => write!(f, "submitted"),
            ReportStatus::Progress => write!(f, "progress"),
            ReportStatus::Complete => write!(f, "complete"),
            ReportStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Issue category enum matching database enum. The value set is closed;
/// oracle output outside it is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "issue_category")]
pub enum IssueCategory {
    #[sqlx(rename = "Pothole")]
    Pothole,
    #[sqlx(rename = "Streetlight")]
    Streetlight,
    #[sqlx(rename = "Garbage")]
    Garbage,
    #[sqlx(rename = "Water Stagnation")]
    #[serde(rename = "Water Stagnation")]
    WaterStagnation,
    #[sqlx(rename = "Other")]
    Other,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Pothole => write!(f, "Pothole"),
            IssueCategory::Streetlight => write!(f, "Streetlight"),
            IssueCategory::Garbage => write!(f, "Garbage"),
            IssueCategory::WaterStagnation => write!(f, "Water Stagnation"),
            IssueCategory::Other => write!(f, "Other"),
        }
    }
}

impl IssueCategory {
    pub const WIRE_VALUES: [&'static str; 5] = [
        "Pothole",
        "Streetlight",
        "Garbage",
        "Water Stagnation",
        "Other",
    ];
}

/// Responsible department enum matching database enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "department")]
pub enum Department {
    #[sqlx(rename = "Department of Drinking Water and Sanitation")]
    #[serde(rename = "Department of Drinking Water and Sanitation")]
    DrinkingWaterAndSanitation,
    #[sqlx(rename = "Department of Rural Works")]
    #[serde(rename = "Department of Rural Works")]
    RuralWorks,
    #[sqlx(rename = "Department of Road Construction")]
    #[serde(rename = "Department of Road Construction")]
    RoadConstruction,
    #[sqlx(rename = "Department of Energy")]
    #[serde(rename = "Department of Energy")]
    Energy,
    #[sqlx(rename = "Department of Health, Medical Education & Family Welfare")]
    #[serde(rename = "Department of Health, Medical Education & Family Welfare")]
    HealthAndFamilyWelfare,
}

impl Department {
    pub const WIRE_VALUES: [&'static str; 5] = [
        "Department of Drinking Water and Sanitation",
        "Department of Rural Works",
        "Department of Road Construction",
        "Department of Energy",
        "Department of Health, Medical Education & Family Welfare",
    ];
}

/// Database model for a deduplicated report. Location and classification are
/// immutable after creation; only count and status mutate.
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub category: IssueCategory,
    pub department: Department,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub count: i32,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new report
#[derive(Debug, Clone)]
pub struct NewReport {
    pub category: IssueCategory,
    pub department: Department,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
}

/// Database model for one citizen contribution
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct Submission {
    pub id: Uuid,
    pub report_id: Uuid,
    pub user_id: String,
    pub image_name: String,
    pub created_at: DateTime<Utc>,
}

/// Admin closure record; exists iff the report has been marked complete.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct Resolution {
    pub report_id: Uuid,
    pub resolved_at: DateTime<Utc>,
    pub image_name: String,
    pub remarks: String,
}

/// An open report returned by the proximity query, with its great-circle
/// distance from the submission point.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub id: Uuid,
    pub description: String,
    pub category: IssueCategory,
    pub department: Department,
    pub distance_meters: f64,
}

/// Aggregate projection of a report: submissions folded into an image set,
/// resolution joined when present. Contributing user ids stay internal.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub id: Uuid,
    pub category: IssueCategory,
    pub department: Department,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub count: i32,
    pub status: ReportStatus,
    pub date_of_report: DateTime<Utc>,
    pub images: Vec<String>,
    pub resolution: Option<Resolution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_labels_are_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReportStatus::Submitted).unwrap(),
            r#""submitted""#
        );
        let parsed: ReportStatus = serde_json::from_str(r#""progress""#).unwrap();
        assert_eq!(parsed, ReportStatus::Progress);
    }

    #[test]
    fn test_water_stagnation_label_round_trips() {
        let parsed: IssueCategory = serde_json::from_str(r#""Water Stagnation""#).unwrap();
        assert_eq!(parsed, IssueCategory::WaterStagnation);
        assert_eq!(parsed.to_string(), "Water Stagnation");
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = serde_json::from_str::<IssueCategory>(r#""Sinkhole""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_department_labels_match_fixed_set() {
        for value in Department::WIRE_VALUES {
            let json = format!("\"{}\"", value);
            assert!(serde_json::from_str::<Department>(&json).is_ok());
        }
        assert!(serde_json::from_str::<Department>(r#""Department of Magic""#).is_err());
    }

    #[test]
    fn test_only_submitted_and_progress_are_open() {
        assert!(ReportStatus::Submitted.is_open());
        assert!(ReportStatus::Progress.is_open());
        assert!(!ReportStatus::Complete.is_open());
        assert!(!ReportStatus::Rejected.is_open());
    }
}
