use agents::LearnerProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type, types::Json};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CourseError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Course not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[sqlx(type_name = "course_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CourseStatus {
    Draft,
    Generating,
    Active,
    InProgress,
    AwaitingAssessment,
    AssessmentReady,
    Completed,
    GenerationFailed,
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CourseStatus::Draft => write!(f, "draft"),
            CourseStatus::Generating => write!(f, "generating"),
            CourseStatus::Active => write!(f, "active"),
            CourseStatus::InProgress => write!(f, "in_progress"),
            CourseStatus::AwaitingAssessment => write!(f, "awaiting_assessment"),
            CourseStatus::AssessmentReady => write!(f, "assessment_ready"),
            CourseStatus::Completed => write!(f, "completed"),
            CourseStatus::GenerationFailed => write!(f, "generation_failed"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub source_type: String,
    pub input_description: Option<String>,
    #[ts(as = "Vec<String>")]
    pub input_objectives: Json<Vec<String>>,
    #[ts(as = "Option<LearnerProfile>")]
    pub learner_profile: Option<Json<LearnerProfile>>,
    pub generated_description: Option<String>,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateCourse {
    pub description: Option<String>,
    pub objectives: Vec<String>,
    pub learner_profile: Option<LearnerProfile>,
}

impl Course {
    pub fn objectives(&self) -> &[String] {
        &self.input_objectives.0
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateCourse,
        id: Uuid,
    ) -> Result<Self, CourseError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, source_type, input_description, input_objectives, learner_profile)
            VALUES (?1, 'custom', ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.description)
        .bind(Json(&data.objectives))
        .bind(data.learner_profile.as_ref().map(Json))
        .fetch_one(pool)
        .await?;

        Ok(course)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, CourseError> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(course)
    }

    pub async fn find_all(
        pool: &SqlitePool,
        status: Option<CourseStatus>,
    ) -> Result<Vec<Self>, CourseError> {
        let courses = match status {
            Some(status) => {
                sqlx::query_as::<_, Course>(
                    "SELECT * FROM courses WHERE status = ?1 ORDER BY created_at DESC",
                )
                .bind(status)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at DESC")
                    .fetch_all(pool)
                    .await?
            }
        };

        Ok(courses)
    }

    pub async fn find_by_status(
        pool: &SqlitePool,
        status: CourseStatus,
    ) -> Result<Vec<Self>, CourseError> {
        Self::find_all(pool, Some(status)).await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: CourseStatus,
    ) -> Result<Self, CourseError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET status = ?2, updated_at = datetime('now','subsec')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        course.ok_or(CourseError::NotFound)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, CourseError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
