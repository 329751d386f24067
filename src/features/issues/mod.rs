pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{
    DuplicateMatcher, GeminiClassifier, LifecycleService, PgGeoIndex, ReportService,
    SpatialCellLocks, SubmissionService,
};
