use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LessonError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Lesson not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS)]
#[sqlx(type_name = "lesson_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LessonStatus {
    Locked,
    Unlocked,
    Completed,
}

/// Where one objective stands: no lesson yet, a lesson without its activity,
/// or both rows present. The Partial variant carries the stored lesson so a
/// resumed run can reuse its content without a second lookup.
#[derive(Debug, Clone)]
pub enum ObjectiveProgress {
    Absent,
    Partial(Lesson),
    Complete,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub objective_index: i64,
    pub lesson_content: String,
    pub status: LessonStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateLesson {
    pub course_id: Uuid,
    pub objective_index: i64,
    pub lesson_content: String,
    pub status: LessonStatus,
}

impl Lesson {
    pub async fn create(pool: &SqlitePool, data: &CreateLesson) -> Result<Self, LessonError> {
        let id = Uuid::new_v4();
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (id, course_id, objective_index, lesson_content, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.course_id)
        .bind(data.objective_index)
        .bind(&data.lesson_content)
        .bind(data.status)
        .fetch_one(pool)
        .await?;

        Ok(lesson)
    }

    pub async fn find_by_course(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<Vec<Self>, LessonError> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT * FROM lessons
            WHERE course_id = ?1
            ORDER BY objective_index ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        Ok(lessons)
    }

    pub async fn find_by_course_and_index(
        pool: &SqlitePool,
        course_id: Uuid,
        objective_index: i64,
    ) -> Result<Option<Self>, LessonError> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = ?1 AND objective_index = ?2",
        )
        .bind(course_id)
        .bind(objective_index)
        .fetch_optional(pool)
        .await?;

        Ok(lesson)
    }

    /// Derive the resumability state for one objective index.
    pub async fn objective_progress(
        pool: &SqlitePool,
        course_id: Uuid,
        objective_index: i64,
    ) -> Result<ObjectiveProgress, LessonError> {
        let lesson = Self::find_by_course_and_index(pool, course_id, objective_index).await?;
        let Some(lesson) = lesson else {
            return Ok(ObjectiveProgress::Absent);
        };

        let activity_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activities WHERE lesson_id = ?1")
                .bind(lesson.id)
                .fetch_one(pool)
                .await?;

        if activity_count == 0 {
            Ok(ObjectiveProgress::Partial(lesson))
        } else {
            Ok(ObjectiveProgress::Complete)
        }
    }

    pub async fn count_for_course(pool: &SqlitePool, course_id: Uuid) -> Result<i64, LessonError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE course_id = ?1")
                .bind(course_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    pub async fn count_completed_for_course(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<i64, LessonError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lessons WHERE course_id = ?1 AND status = 'completed'",
        )
        .bind(course_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn find_next_locked(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<Option<Self>, LessonError> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT * FROM lessons
            WHERE course_id = ?1 AND status = 'locked'
            ORDER BY objective_index ASC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

        Ok(lesson)
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: LessonStatus,
    ) -> Result<Self, LessonError> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "UPDATE lessons SET status = ?2 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        lesson.ok_or(LessonError::NotFound)
    }
}
