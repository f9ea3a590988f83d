use std::sync::Arc;

use anyhow::Error as AnyhowError;
use async_trait::async_trait;
use db::{
    DBService,
    models::course::{Course, CourseError, CourseStatus},
};
use services::services::{
    config::{Config, ConfigError},
    events::EventBroadcaster,
    generation::{GenerationError, GenerationService},
    progression::{self, ProgressionError},
    tracker::GenerationTracker,
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn tracker(&self) -> &GenerationTracker;

    fn events(&self) -> &EventBroadcaster;

    fn generation(&self) -> &GenerationService;

    /// Fail courses left in generating by a previous process, call at startup
    async fn cleanup_orphan_generations(&self) -> Result<(), DeploymentError> {
        let orphans = Course::find_by_status(&self.db().pool, CourseStatus::Generating).await?;
        for course in orphans {
            if self.tracker().is_running(course.id) {
                continue;
            }
            tracing::info!("Found orphaned generation for course {}", course.id);
            if let Err(e) = progression::transition_course(
                &self.db().pool,
                &course,
                CourseStatus::GenerationFailed,
            )
            .await
            {
                tracing::error!(
                    "Failed to mark orphaned generation for course {} as failed: {}",
                    course.id,
                    e
                );
                continue;
            }
            tracing::info!(
                "Marked orphaned generation for course {} as failed",
                course.id
            );
        }
        Ok(())
    }
}
