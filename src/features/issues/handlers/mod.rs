pub mod admin_handler;
pub mod issue_handler;

pub use admin_handler::{list_all_issues, update_issue_status, AdminState};
pub use issue_handler::{list_issues, submit_issue, IssueState};
