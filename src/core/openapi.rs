use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::images::handler as image_handler;
use crate::features::issues::{dtos as issue_dtos, handlers as issue_handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Issues (citizen)
        issue_handlers::issue_handler::submit_issue,
        issue_handlers::issue_handler::list_issues,
        // Admin
        issue_handlers::admin_handler::list_all_issues,
        issue_handlers::admin_handler::update_issue_status,
        // Images (public)
        image_handler::get_image,
    ),
    components(
        schemas(
            auth::model::AuthenticatedUser,
            models::ReportStatus,
            models::IssueCategory,
            models::Department,
            issue_dtos::SubmissionOutcomeDto,
            issue_dtos::SubmitIssueResponseDto,
            issue_dtos::IssueListFilter,
            issue_dtos::ReportViewDto,
            issue_dtos::ResolutionDto,
            issue_dtos::ReportDto,
            issue_dtos::UpdateIssueStatusDto,
        )
    ),
    tags(
        (name = "issues", description = "Citizen issue submission and listing"),
        (name = "admin", description = "Report lifecycle administration"),
        (name = "images", description = "Stored image passthrough"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Nagarseva API",
        version = "0.1.0",
        description = "Civic issue reporting API",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
