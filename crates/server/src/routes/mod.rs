use axum::{
    Router,
    routing::{IntoMakeService, get},
};
use tower_http::cors::CorsLayer;

use crate::DeploymentImpl;

pub mod config;
pub mod courses;
pub mod events;
pub mod health;

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(config::router())
        .merge(courses::router(&deployment))
        .with_state(deployment);

    Router::new()
        .nest("/api", base_routes)
        .layer(CorsLayer::permissive())
        .into_make_service()
}
