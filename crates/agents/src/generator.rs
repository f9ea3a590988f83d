use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::outputs::{ActivitySeed, ActivitySpec, LessonContent, LessonPlan};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator not configured: {0}")]
    NotConfigured(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("Provider temporarily overloaded")]
    Overloaded,
    #[error("Failed to parse model output: {0}")]
    ParseError(String),
    #[error("Model output failed validation: {0}")]
    InvalidOutput(String),
}

impl GeneratorError {
    /// Transient failures and malformed outputs are worth another model
    /// call. Configuration problems and 4xx responses are not.
    pub fn should_retry(&self) -> bool {
        match self {
            GeneratorError::RateLimited
            | GeneratorError::Overloaded
            | GeneratorError::RequestFailed(_)
            | GeneratorError::ParseError(_)
            | GeneratorError::InvalidOutput(_) => true,
            GeneratorError::ApiError { status, .. } => *status >= 500,
            GeneratorError::NotConfigured(_) => false,
        }
    }
}

/// Who the course is for. Shapes tone and examples in every prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct LearnerProfile {
    #[ts(optional)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub learning_goals: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[ts(optional)]
    pub learning_style: Option<String>,
    #[ts(optional)]
    pub tone_preference: Option<String>,
}

/// Course-level inputs shared by every generator call in one run.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub course_id: Uuid,
    pub course_description: String,
    pub all_objectives: Vec<String>,
    pub objective_index: Option<i64>,
    pub learner_profile: Option<LearnerProfile>,
}

impl GenerationContext {
    /// Objectives other than `current`, used to keep each lesson out of
    /// its siblings' territory.
    pub fn other_objectives(&self, current: &str) -> Vec<&str> {
        self.all_objectives
            .iter()
            .filter(|objective| objective.as_str() != current)
            .map(|objective| objective.as_str())
            .collect()
    }
}

/// Inputs for the activity step. `seed` and `mastery_criteria` come from
/// the plan when one was produced this run; a resumed run that reuses
/// stored lesson content has neither.
#[derive(Debug, Clone)]
pub struct ActivityRequest {
    pub objective: String,
    pub lesson_content: String,
    pub seed: Option<ActivitySeed>,
    pub mastery_criteria: Vec<String>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn plan_lesson(
        &self,
        objective: &str,
        context: &GenerationContext,
    ) -> Result<LessonPlan, GeneratorError>;

    async fn write_lesson(
        &self,
        plan: &LessonPlan,
        context: &GenerationContext,
    ) -> Result<LessonContent, GeneratorError>;

    async fn create_activity(
        &self,
        request: &ActivityRequest,
        context: &GenerationContext,
    ) -> Result<ActivitySpec, GeneratorError>;
}

/// Audit row for one generator invocation, retries included.
#[derive(Debug, Clone)]
pub struct AgentCallRecord {
    pub course_id: Uuid,
    pub agent_name: &'static str,
    pub objective_index: Option<i64>,
    pub prompt: String,
    pub output: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub model_name: String,
}

/// Sink for call audit rows. Recording must never fail the call it
/// describes.
#[async_trait]
pub trait CallRecorder: Send + Sync {
    async fn record(&self, call: AgentCallRecord);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_retry() {
        assert!(GeneratorError::RateLimited.should_retry());
        assert!(GeneratorError::Overloaded.should_retry());
        assert!(GeneratorError::RequestFailed("timeout".to_string()).should_retry());
        assert!(
            GeneratorError::ApiError {
                status: 500,
                message: "internal".to_string()
            }
            .should_retry()
        );
    }

    #[test]
    fn malformed_output_retries() {
        assert!(GeneratorError::ParseError("not json".to_string()).should_retry());
        assert!(GeneratorError::InvalidOutput("too few hints".to_string()).should_retry());
    }

    #[test]
    fn permanent_errors_do_not_retry() {
        assert!(!GeneratorError::NotConfigured("no api key".to_string()).should_retry());
        assert!(
            !GeneratorError::ApiError {
                status: 400,
                message: "bad request".to_string()
            }
            .should_retry()
        );
    }

    #[test]
    fn other_objectives_excludes_the_current_one() {
        let context = GenerationContext {
            course_id: Uuid::new_v4(),
            course_description: "Weather basics".to_string(),
            all_objectives: vec![
                "Explain the water cycle".to_string(),
                "Read a weather map".to_string(),
                "Describe cloud types".to_string(),
            ],
            objective_index: Some(1),
            learner_profile: None,
        };
        let others = context.other_objectives("Read a weather map");
        assert_eq!(others, vec!["Explain the water cycle", "Describe cloud types"]);
    }
}
