use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::core::error::{AppError, Result};
use crate::modules::storage::ObjectStore;

/// Resolve an image reference to its storage URL. Core passes references
/// through without inspecting bytes; the store answers for missing objects.
#[utoipa::path(
    get,
    path = "/api/images/{name}",
    params(
        ("name" = String, Path, description = "Image reference returned by a submission")
    ),
    responses(
        (status = 303, description = "Redirect to the stored image"),
        (status = 400, description = "Malformed image reference")
    ),
    tag = "images"
)]
pub async fn get_image(
    State(storage): State<Arc<ObjectStore>>,
    Path(name): Path<String>,
) -> Result<Redirect> {
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(AppError::BadRequest("Invalid image name".to_string()));
    }

    Ok(Redirect::to(&storage.public_url(&name)))
}
