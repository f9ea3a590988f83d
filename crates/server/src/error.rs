use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::{
    activity::ActivityError, agent_call::AgentCallError, assessment::AssessmentError,
    course::CourseError, lesson::LessonError,
};
use deployment::DeploymentError;
use services::services::{
    config::ConfigError, generation::GenerationError, progression::ProgressionError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    AgentCall(#[from] AgentCallError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl From<CourseError> for ApiError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::Database(e) => ApiError::Database(e),
            CourseError::NotFound => ApiError::NotFound("Course not found".into()),
        }
    }
}

impl From<LessonError> for ApiError {
    fn from(err: LessonError) -> Self {
        match err {
            LessonError::Database(e) => ApiError::Database(e),
            LessonError::NotFound => ApiError::NotFound("Lesson not found".into()),
        }
    }
}

impl From<ActivityError> for ApiError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::Database(e) => ApiError::Database(e),
            ActivityError::NotFound => ApiError::NotFound("Activity not found".into()),
        }
    }
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
            ProgressionError::GuardFailed { .. } => ApiError::BadRequest(err.to_string()),
            ProgressionError::Course(e) => ApiError::from(e),
            ProgressionError::Lesson(e) => ApiError::from(e),
            ProgressionError::Assessment(e) => ApiError::Assessment(e),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            GenerationError::Course(e) => ApiError::from(e),
            GenerationError::Lesson(e) => ApiError::from(e),
            GenerationError::Activity(e) => ApiError::from(e),
            GenerationError::Progression(e) => ApiError::from(e),
            GenerationError::Generator(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            ApiError::Assessment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AssessmentError"),
            ApiError::AgentCall(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AgentCallError"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            ApiError::Conflict(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalError(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
