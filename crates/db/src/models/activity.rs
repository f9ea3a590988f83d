use agents::ActivitySpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, types::Json};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Activity not found")]
    NotFound,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Activity {
    pub id: Uuid,
    pub lesson_id: Uuid,
    #[ts(as = "ActivitySpec")]
    pub activity_spec: Json<ActivitySpec>,
    pub latest_score: Option<f64>,
    #[ts(type = "unknown | null")]
    pub latest_feedback: Option<Json<Value>>,
    pub mastery_decision: Option<String>,
    pub attempt_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateActivity {
    pub lesson_id: Uuid,
    pub activity_spec: ActivitySpec,
}

impl Activity {
    pub async fn create(pool: &SqlitePool, data: &CreateActivity) -> Result<Self, ActivityError> {
        let id = Uuid::new_v4();
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (id, lesson_id, activity_spec)
            VALUES (?1, ?2, ?3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.lesson_id)
        .bind(Json(&data.activity_spec))
        .fetch_one(pool)
        .await?;

        Ok(activity)
    }

    pub async fn find_by_lesson(
        pool: &SqlitePool,
        lesson_id: Uuid,
    ) -> Result<Vec<Self>, ActivityError> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE lesson_id = ?1 ORDER BY created_at ASC",
        )
        .bind(lesson_id)
        .fetch_all(pool)
        .await?;

        Ok(activities)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        lesson::{CreateLesson, Lesson, LessonStatus},
        test_utils::{create_test_course, setup_test_pool, test_activity_spec},
    };

    #[tokio::test]
    async fn create_stores_the_spec_as_json() {
        let pool = setup_test_pool().await;
        let course_id = create_test_course(&pool, &["A"]).await;
        let lesson = Lesson::create(
            &pool,
            &CreateLesson {
                course_id,
                objective_index: 0,
                lesson_content: "content".to_string(),
                status: LessonStatus::Unlocked,
            },
        )
        .await
        .unwrap();

        let created = Activity::create(
            &pool,
            &CreateActivity {
                lesson_id: lesson.id,
                activity_spec: test_activity_spec(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.attempt_count, 0);
        assert!(created.latest_score.is_none());

        let found = Activity::find_by_lesson(&pool, lesson.id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].activity_spec.0.activity_type,
            test_activity_spec().activity_type
        );
    }
}
