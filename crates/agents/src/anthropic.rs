use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::generator::{
    ActivityRequest, AgentCallRecord, CallRecorder, ContentGenerator, GenerationContext,
    GeneratorError,
};
use crate::outputs::{ActivitySpec, LessonContent, LessonPlan};
use crate::prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 8192;
const MAX_RETRIES: usize = 2;

/// Content generator backed by the Anthropic Messages API. Each agent
/// call is one messages request whose text output must parse into the
/// agent's structured output type.
pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    model: String,
    recorder: Option<Arc<dyn CallRecorder>>,
}

impl AnthropicGenerator {
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = api_key.unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("ANTHROPIC_API_KEY not set, content generation will fail");
        }
        AnthropicGenerator {
            client: Client::new(),
            api_key,
            model: model.into(),
            recorder: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Self {
        Self::new(model, std::env::var("ANTHROPIC_API_KEY").ok())
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CallRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// One messages request. Returns the concatenated text output plus
    /// token usage when the API reports it.
    async fn complete_internal(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<(String, Option<i64>, Option<i64>), GeneratorError> {
        if self.api_key.is_empty() {
            return Err(GeneratorError::NotConfigured(
                "ANTHROPIC_API_KEY is not set".to_string(),
            ));
        }

        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "system": system,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::RateLimited);
        }
        if status.as_u16() == 529 {
            return Err(GeneratorError::Overloaded);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GeneratorError::ParseError(e.to_string()))?;
        let text = extract_text(&body)?;
        let input_tokens = body["usage"]["input_tokens"].as_i64();
        let output_tokens = body["usage"]["output_tokens"].as_i64();
        Ok((text, input_tokens, output_tokens))
    }

    /// Runs one agent call end to end: request, parse, validate, with
    /// retries around the whole unit so a malformed output earns a fresh
    /// model call. Records the outcome when a recorder is attached.
    async fn run_agent<T, F>(
        &self,
        agent_name: &'static str,
        system: &'static str,
        prompt: String,
        context: &GenerationContext,
        validate: F,
    ) -> Result<T, GeneratorError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Result<(), String>,
    {
        let started = Instant::now();

        let result = (|| async {
            let (text, input_tokens, output_tokens) =
                self.complete_internal(system, &prompt).await?;
            let parsed: T = parse_structured(&text)?;
            validate(&parsed).map_err(GeneratorError::InvalidOutput)?;
            Ok::<_, GeneratorError>((parsed, text, input_tokens, output_tokens))
        })
        .retry(
            &ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(MAX_RETRIES)
                .with_jitter(),
        )
        .when(|e: &GeneratorError| e.should_retry())
        .notify(|err: &GeneratorError, dur: Duration| {
            tracing::warn!(
                "{} call failed, retrying after {:.2}s: {}",
                agent_name,
                dur.as_secs_f64(),
                err
            );
        })
        .await;

        let duration_ms = started.elapsed().as_millis() as i64;
        match &result {
            Ok((_, raw, input_tokens, output_tokens)) => {
                self.record_call(AgentCallRecord {
                    course_id: context.course_id,
                    agent_name,
                    objective_index: context.objective_index,
                    prompt,
                    output: Some(raw.clone()),
                    success: true,
                    error_message: None,
                    duration_ms,
                    input_tokens: *input_tokens,
                    output_tokens: *output_tokens,
                    model_name: self.model.clone(),
                })
                .await;
            }
            Err(err) => {
                self.record_call(AgentCallRecord {
                    course_id: context.course_id,
                    agent_name,
                    objective_index: context.objective_index,
                    prompt,
                    output: None,
                    success: false,
                    error_message: Some(err.to_string()),
                    duration_ms,
                    input_tokens: None,
                    output_tokens: None,
                    model_name: self.model.clone(),
                })
                .await;
            }
        }

        result.map(|(parsed, _, _, _)| parsed)
    }

    async fn record_call(&self, call: AgentCallRecord) {
        if let Some(recorder) = &self.recorder {
            recorder.record(call).await;
        }
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    async fn plan_lesson(
        &self,
        objective: &str,
        context: &GenerationContext,
    ) -> Result<LessonPlan, GeneratorError> {
        let prompt = prompts::lesson_planner_prompt(objective, context);
        self.run_agent(
            "lesson_planner",
            prompts::LESSON_PLANNER_SYSTEM,
            prompt,
            context,
            LessonPlan::validate,
        )
        .await
    }

    async fn write_lesson(
        &self,
        plan: &LessonPlan,
        context: &GenerationContext,
    ) -> Result<LessonContent, GeneratorError> {
        let prompt = prompts::lesson_writer_prompt(plan, context);
        self.run_agent(
            "lesson_writer",
            prompts::LESSON_WRITER_SYSTEM,
            prompt,
            context,
            LessonContent::validate,
        )
        .await
    }

    async fn create_activity(
        &self,
        request: &ActivityRequest,
        context: &GenerationContext,
    ) -> Result<ActivitySpec, GeneratorError> {
        let prompt = prompts::activity_creator_prompt(request, context);
        self.run_agent(
            "activity_creator",
            prompts::ACTIVITY_CREATOR_SYSTEM,
            prompt,
            context,
            ActivitySpec::validate,
        )
        .await
    }
}

fn extract_text(body: &Value) -> Result<String, GeneratorError> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| GeneratorError::ParseError("response has no content array".to_string()))?;
    let text: String = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();
    if text.is_empty() {
        return Err(GeneratorError::ParseError(
            "response contained no text blocks".to_string(),
        ));
    }
    Ok(text)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, GeneratorError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| GeneratorError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::ActivitySeed;
    use uuid::Uuid;

    #[test]
    fn strip_code_fences_handles_plain_json() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn strip_code_fences_removes_fences() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strip_code_fences_removes_json_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn extract_text_joins_text_blocks() {
        let body = json!({
            "content": [
                { "type": "text", "text": "{\"a\":" },
                { "type": "tool_use", "id": "x", "name": "y", "input": {} },
                { "type": "text", "text": " 1}" }
            ],
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        });
        assert_eq!(extract_text(&body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn extract_text_fails_without_content() {
        let body = json!({ "error": { "message": "bad" } });
        assert!(matches!(
            extract_text(&body),
            Err(GeneratorError::ParseError(_))
        ));
    }

    #[test]
    fn parse_structured_reads_fenced_plan_output() {
        let raw = "```json\n{\n  \"activity_type\": \"short_answer\",\n  \"prompt\": \"Trace a raindrop\",\n  \"expected_evidence\": [\"evaporation\", \"condensation\"]\n}\n```";
        let seed: ActivitySeed = parse_structured(raw).unwrap();
        assert_eq!(seed.activity_type, "short_answer");
        assert_eq!(seed.expected_evidence.len(), 2);
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let generator = AnthropicGenerator::new("claude-sonnet-4-20250514", None);
        let context = GenerationContext {
            course_id: Uuid::new_v4(),
            course_description: "Weather basics".to_string(),
            all_objectives: vec!["Explain the water cycle".to_string()],
            objective_index: Some(0),
            learner_profile: None,
        };
        let result = generator.plan_lesson("Explain the water cycle", &context).await;
        assert!(matches!(result, Err(GeneratorError::NotConfigured(_))));
    }
}
