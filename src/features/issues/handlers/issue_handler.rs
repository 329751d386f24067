use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::issues::dtos::{
    IssueListFilter, ListIssuesQuery, ReportViewDto, SubmitIssueCoords, SubmitIssueResponseDto,
};
use crate::features::issues::services::{ImagePayload, ReportService, SubmissionService};
use crate::modules::storage::ObjectStore;
use crate::shared::types::ApiResponse;

/// State for citizen issue handlers
#[derive(Clone)]
pub struct IssueState {
    pub submissions: Arc<SubmissionService>,
    pub reports: Arc<ReportService>,
    pub storage: Arc<ObjectStore>,
}

/// Submit a photographed issue. The image is classified against nearby open
/// reports and either merged into one of them or recorded as a new report.
#[utoipa::path(
    post,
    path = "/api/issues",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Fields: image (file), lat (number), lon (number)"
    ),
    responses(
        (status = 201, description = "Submission created or merged", body = ApiResponse<SubmitIssueResponseDto>),
        (status = 400, description = "Missing image or invalid coordinates"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Classification failed; resubmit"),
        (status = 503, description = "Store unavailable; retry")
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn submit_issue(
    user: AuthenticatedUser,
    State(state): State<IssueState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SubmitIssueResponseDto>>)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut image: Option<ImagePayload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("lat") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable lat field: {}", e)))?;
                lat = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::BadRequest("lat must be a number".to_string()))?,
                );
            }
            Some("lon") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable lon field: {}", e)))?;
                lon = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::BadRequest("lon must be a number".to_string()))?,
                );
            }
            Some("image") => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Unreadable image field: {}", e)))?;
                image = Some(ImagePayload {
                    bytes: bytes.to_vec(),
                    mime_type,
                });
            }
            _ => {}
        }
    }

    let (lat, lon) = match (lat, lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(AppError::BadRequest("lat and lon are required".to_string())),
    };
    let image = image.ok_or_else(|| AppError::BadRequest("image file is required".to_string()))?;
    if image.bytes.is_empty() {
        return Err(AppError::BadRequest("image file is empty".to_string()));
    }

    let coords = SubmitIssueCoords { lat, lon };
    coords
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Bytes go to storage first; everything after this point works with the
    // reference only.
    let image_name = state.storage.put_image(&image.bytes, &image.mime_type).await?;

    let receipt = state
        .submissions
        .submit(&user.sub, lat, lon, &image, &image_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(SubmitIssueResponseDto::from_receipt(receipt, image_name)),
            None,
        )),
    ))
}

/// List reports, optionally filtered by status or restricted to the caller's
/// own contributions.
#[utoipa::path(
    get,
    path = "/api/issues",
    params(ListIssuesQuery),
    responses(
        (status = 200, description = "Aggregate report views", body = ApiResponse<Vec<ReportViewDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "issues"
)]
pub async fn list_issues(
    user: AuthenticatedUser,
    State(state): State<IssueState>,
    Query(query): Query<ListIssuesQuery>,
) -> Result<Json<ApiResponse<Vec<ReportViewDto>>>> {
    let contributor = match query.filter {
        Some(IssueListFilter::User) => Some(user.sub.as_str()),
        _ => None,
    };

    let views = state.reports.list_views(query.status, contributor).await?;
    let dtos: Vec<ReportViewDto> = views.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::success(Some(dtos), None)))
}
