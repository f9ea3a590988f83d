use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, types::Json};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Assessment {
    pub id: Uuid,
    pub course_id: Uuid,
    #[ts(type = "unknown | null")]
    pub assessment_spec: Option<Json<Value>>,
    pub score: Option<f64>,
    pub passed: Option<bool>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub async fn create(pool: &SqlitePool, course_id: Uuid) -> Result<Self, AssessmentError> {
        let id = Uuid::new_v4();
        let assessment = sqlx::query_as::<_, Assessment>(
            "INSERT INTO assessments (id, course_id) VALUES (?1, ?2) RETURNING *",
        )
        .bind(id)
        .bind(course_id)
        .fetch_one(pool)
        .await?;

        Ok(assessment)
    }

    pub async fn count_for_course(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<i64, AssessmentError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM assessments WHERE course_id = ?1")
                .bind(course_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    pub async fn any_passed_for_course(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<bool, AssessmentError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM assessments WHERE course_id = ?1 AND passed = 1",
        )
        .bind(course_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn mark_passed(
        pool: &SqlitePool,
        id: Uuid,
        score: f64,
    ) -> Result<Self, AssessmentError> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            UPDATE assessments
            SET passed = 1, score = ?2, status = 'passed'
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(score)
        .fetch_one(pool)
        .await?;

        Ok(assessment)
    }
}
