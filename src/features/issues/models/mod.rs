mod report;

pub use report::{
    CandidateReport, Department, IssueCategory, NewReport, Report, ReportStatus, ReportView,
    Resolution, Submission,
};
