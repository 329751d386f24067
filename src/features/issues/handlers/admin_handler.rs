use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::issues::dtos::{ReportDto, ReportViewDto, UpdateIssueStatusDto};
use crate::features::issues::services::{LifecycleService, ReportService};
use crate::shared::types::ApiResponse;

/// State for administrative handlers
#[derive(Clone)]
pub struct AdminState {
    pub reports: Arc<ReportService>,
    pub lifecycle: Arc<LifecycleService>,
}

fn require_admin(user: &AuthenticatedUser) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ))
    }
}

/// List every report for administrative triage.
#[utoipa::path(
    get,
    path = "/api/admin/issues",
    responses(
        (status = 200, description = "All aggregate report views", body = ApiResponse<Vec<ReportViewDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrator role required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_all_issues(
    user: AuthenticatedUser,
    State(state): State<AdminState>,
) -> Result<Json<ApiResponse<Vec<ReportViewDto>>>> {
    require_admin(&user)?;

    let views = state.reports.list_views(None, None).await?;
    let dtos: Vec<ReportViewDto> = views.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(Some(dtos), None)))
}

/// Move a report through its lifecycle. Completing requires an evidence
/// image and remarks, which become the report's resolution record.
#[utoipa::path(
    patch,
    path = "/api/admin/issues/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateIssueStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReportDto>),
        (status = 400, description = "Invalid transition or missing evidence"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_issue_status(
    user: AuthenticatedUser,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateIssueStatusDto>,
) -> Result<Json<ApiResponse<ReportDto>>> {
    require_admin(&user)?;

    let report = state
        .lifecycle
        .transition(
            id,
            dto.status,
            dto.evidence_image.as_deref(),
            dto.remarks.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(Some(report.into()), None)))
}
