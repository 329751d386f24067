mod cell_lock;
mod classifier;
mod geo_index;
mod lifecycle_service;
mod matcher_service;
mod report_service;
mod submission_service;

pub use cell_lock::SpatialCellLocks;
pub use classifier::{Classification, GeminiClassifier, ImagePayload, IssueClassifier};
pub use geo_index::{GeoIndex, PgGeoIndex};
pub use lifecycle_service::LifecycleService;
pub use matcher_service::{DuplicateMatcher, MatchDecision};
pub use report_service::ReportService;
pub use submission_service::{SubmissionOutcome, SubmissionReceipt, SubmissionService};
