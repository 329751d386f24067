mod issue_dto;

pub use issue_dto::{
    IssueListFilter, ListIssuesQuery, ReportDto, ReportViewDto, ResolutionDto,
    SubmissionOutcomeDto, SubmitIssueCoords, SubmitIssueResponseDto, UpdateIssueStatusDto,
};
