use agents::{AgentCallRecord, CallRecorder};
use async_trait::async_trait;
use db::{
    DBService,
    models::agent_call::{AgentCall, CreateAgentCall},
};

/// Persists every generator invocation to the agent_calls table.
/// Recording failures are logged and swallowed so an audit problem
/// never fails the generation it describes.
#[derive(Clone)]
pub struct CallLog {
    db: DBService,
}

impl CallLog {
    pub fn new(db: DBService) -> Self {
        CallLog { db }
    }
}

#[async_trait]
impl CallRecorder for CallLog {
    async fn record(&self, call: AgentCallRecord) {
        let data = CreateAgentCall {
            course_id: call.course_id,
            agent_name: call.agent_name.to_string(),
            objective_index: call.objective_index,
            prompt: call.prompt,
            output: call.output,
            status: if call.success { "success" } else { "error" }.to_string(),
            error_message: call.error_message,
            duration_ms: Some(call.duration_ms),
            input_tokens: call.input_tokens,
            output_tokens: call.output_tokens,
            model_name: Some(call.model_name),
        };

        if let Err(err) = AgentCall::create(&self.db.pool, &data).await {
            tracing::warn!(
                "Failed to record {} call for course {}: {}",
                data.agent_name,
                data.course_id,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_test_course, setup_test_pool};

    #[tokio::test]
    async fn records_a_successful_call() {
        let pool = setup_test_pool().await;
        let course = create_test_course(&pool, &["A"]).await;
        let log = CallLog::new(DBService { pool: pool.clone() });

        log.record(AgentCallRecord {
            course_id: course.id,
            agent_name: "lesson_planner",
            objective_index: Some(0),
            prompt: "plan it".to_string(),
            output: Some("{\"lesson_title\": \"T\"}".to_string()),
            success: true,
            error_message: None,
            duration_ms: 1200,
            input_tokens: Some(310),
            output_tokens: Some(645),
            model_name: "claude-sonnet-4-20250514".to_string(),
        })
        .await;

        let calls = AgentCall::find_by_course(&pool, course.id).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].agent_name, "lesson_planner");
        assert_eq!(calls[0].status, "success");
        assert_eq!(calls[0].duration_ms, Some(1200));
        assert_eq!(calls[0].input_tokens, Some(310));
    }

    #[tokio::test]
    async fn records_a_failed_call_with_its_error() {
        let pool = setup_test_pool().await;
        let course = create_test_course(&pool, &["A"]).await;
        let log = CallLog::new(DBService { pool: pool.clone() });

        log.record(AgentCallRecord {
            course_id: course.id,
            agent_name: "lesson_writer",
            objective_index: Some(2),
            prompt: "write it".to_string(),
            output: None,
            success: false,
            error_message: Some("API error 529: overloaded".to_string()),
            duration_ms: 80,
            input_tokens: None,
            output_tokens: None,
            model_name: "claude-sonnet-4-20250514".to_string(),
        })
        .await;

        let calls = AgentCall::find_by_course(&pool, course.id).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, "error");
        assert!(calls[0].output.is_none());
        assert_eq!(
            calls[0].error_message.as_deref(),
            Some("API error 529: overloaded")
        );
    }

    #[tokio::test]
    async fn recording_against_a_missing_course_does_not_panic() {
        let pool = setup_test_pool().await;
        let log = CallLog::new(DBService { pool: pool.clone() });

        // Foreign key violation: the insert fails, the recorder shrugs.
        log.record(AgentCallRecord {
            course_id: uuid::Uuid::new_v4(),
            agent_name: "activity_creator",
            objective_index: None,
            prompt: "p".to_string(),
            output: None,
            success: true,
            error_message: None,
            duration_ms: 5,
            input_tokens: None,
            output_tokens: None,
            model_name: "claude-sonnet-4-20250514".to_string(),
        })
        .await;
    }
}
