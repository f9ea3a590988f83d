use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use services::services::config::{Config, save_config_to_file};
use utils::{assets::config_path, response::ApiResponse};

use crate::{DeploymentImpl, error::ApiError};

pub async fn get_config(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Config>> {
    let config = deployment.config().read().await;
    ResponseJson(ApiResponse::success(config.clone()))
}

/// Replace the stored config. The generator and event broadcaster read
/// their settings at startup, so a new model or buffer size applies from
/// the next process start.
pub async fn update_config(
    State(deployment): State<DeploymentImpl>,
    Json(new_config): Json<Config>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    let mut config = deployment.config().write().await;
    *config = new_config;
    save_config_to_file(&config, &config_path()).await?;
    Ok(ResponseJson(ApiResponse::success(config.clone())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/config", get(get_config).put(update_config))
}
