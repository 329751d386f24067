use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::images::handler;
use crate::modules::storage::ObjectStore;

/// Public image passthrough routes
pub fn routes(storage: Arc<ObjectStore>) -> Router {
    Router::new()
        .route("/api/images/{name}", get(handler::get_image))
        .with_state(storage)
}
