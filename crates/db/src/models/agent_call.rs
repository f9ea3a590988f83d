use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AgentCallError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Audit row for one content-generator invocation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentCall {
    pub id: Uuid,
    pub course_id: Uuid,
    pub agent_name: String,
    pub objective_index: Option<i64>,
    pub prompt: String,
    pub output: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateAgentCall {
    pub course_id: Uuid,
    pub agent_name: String,
    pub objective_index: Option<i64>,
    pub prompt: String,
    pub output: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub model_name: Option<String>,
}

impl AgentCall {
    pub async fn create(pool: &SqlitePool, data: &CreateAgentCall) -> Result<Self, AgentCallError> {
        let id = Uuid::new_v4();
        let call = sqlx::query_as::<_, AgentCall>(
            r#"
            INSERT INTO agent_calls (
                id, course_id, agent_name, objective_index, prompt, output,
                status, error_message, duration_ms, input_tokens, output_tokens, model_name
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.course_id)
        .bind(&data.agent_name)
        .bind(data.objective_index)
        .bind(&data.prompt)
        .bind(&data.output)
        .bind(&data.status)
        .bind(&data.error_message)
        .bind(data.duration_ms)
        .bind(data.input_tokens)
        .bind(data.output_tokens)
        .bind(&data.model_name)
        .fetch_one(pool)
        .await?;

        Ok(call)
    }

    pub async fn find_by_course(
        pool: &SqlitePool,
        course_id: Uuid,
    ) -> Result<Vec<Self>, AgentCallError> {
        let calls = sqlx::query_as::<_, AgentCall>(
            "SELECT * FROM agent_calls WHERE course_id = ?1 ORDER BY created_at ASC",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_course, setup_test_pool};

    #[tokio::test]
    async fn records_are_returned_in_call_order() {
        let pool = setup_test_pool().await;
        let course_id = create_test_course(&pool, &["A"]).await;

        for (agent, status) in [("lesson_planner", "success"), ("lesson_writer", "error")] {
            AgentCall::create(
                &pool,
                &CreateAgentCall {
                    course_id,
                    agent_name: agent.to_string(),
                    objective_index: Some(0),
                    prompt: "p".to_string(),
                    output: None,
                    status: status.to_string(),
                    error_message: None,
                    duration_ms: Some(12),
                    input_tokens: None,
                    output_tokens: None,
                    model_name: Some("claude-sonnet-4-5".to_string()),
                },
            )
            .await
            .unwrap();
        }

        let calls = AgentCall::find_by_course(&pool, course_id).await.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].agent_name, "lesson_planner");
        assert_eq!(calls[1].status, "error");
    }
}
