use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::api::rest::auth::AuthConfig;
use crate::api::rest::{handlers, openapi};
use crate::domain::service::Service;

/// All record endpoints plus the OpenAPI document.
pub fn router(service: Arc<Service>, auth: AuthConfig) -> Router {
    Router::new()
        .route(
            "/applications",
            post(handlers::create_application).get(handlers::list_applications),
        )
        .route(
            "/applications/{id}",
            get(handlers::get_application).patch(handlers::update_application),
        )
        .route("/application-types", get(handlers::list_application_types))
        .route(
            "/application-subtypes",
            get(handlers::list_application_subtypes),
        )
        .route(
            "/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(Extension(service))
        .layer(Extension(auth))
}
