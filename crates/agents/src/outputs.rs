use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Per-objective teaching plan produced by the lesson planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct LessonPlan {
    pub lesson_title: String,
    pub learning_objective: String,
    pub key_concepts: Vec<String>,
    pub lesson_outline: Vec<String>,
    pub suggested_activity: ActivitySeed,
    pub mastery_criteria: Vec<String>,
}

/// Sketch of the practice activity the planner wants for a lesson. The
/// activity creator expands it into a full [`ActivitySpec`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct ActivitySeed {
    pub activity_type: String,
    pub prompt: String,
    pub expected_evidence: Vec<String>,
}

/// Full lesson text produced by the lesson writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct LessonContent {
    pub lesson_title: String,
    pub lesson_body: String,
    pub key_takeaways: Vec<String>,
}

/// Complete, gradeable activity definition. Stored verbatim on the
/// activity row and served to the learner UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct ActivitySpec {
    pub activity_type: String,
    pub instructions: String,
    pub prompt: String,
    pub scoring_rubric: Vec<String>,
    pub hints: Vec<String>,
}

impl LessonPlan {
    pub fn validate(&self) -> Result<(), String> {
        require_text("lesson_title", &self.lesson_title)?;
        require_text("learning_objective", &self.learning_objective)?;
        bounded_list("key_concepts", &self.key_concepts, 2, 8)?;
        bounded_list("lesson_outline", &self.lesson_outline, 3, 10)?;
        self.suggested_activity.validate()?;
        bounded_list("mastery_criteria", &self.mastery_criteria, 2, 6)?;
        Ok(())
    }
}

impl ActivitySeed {
    pub fn validate(&self) -> Result<(), String> {
        require_text("activity_type", &self.activity_type)?;
        require_text("prompt", &self.prompt)?;
        bounded_list("expected_evidence", &self.expected_evidence, 2, 5)?;
        Ok(())
    }
}

impl LessonContent {
    pub fn validate(&self) -> Result<(), String> {
        require_text("lesson_title", &self.lesson_title)?;
        min_chars("lesson_body", &self.lesson_body, 200)?;
        bounded_list("key_takeaways", &self.key_takeaways, 3, 6)?;
        Ok(())
    }
}

impl ActivitySpec {
    pub fn validate(&self) -> Result<(), String> {
        require_text("activity_type", &self.activity_type)?;
        min_chars("instructions", &self.instructions, 50)?;
        min_chars("prompt", &self.prompt, 20)?;
        bounded_list("scoring_rubric", &self.scoring_rubric, 3, 6)?;
        bounded_list("hints", &self.hints, 2, 5)?;
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

fn min_chars(field: &str, value: &str, min: usize) -> Result<(), String> {
    if value.chars().count() < min {
        return Err(format!(
            "{field} must be at least {min} characters, got {}",
            value.chars().count()
        ));
    }
    Ok(())
}

fn bounded_list(field: &str, items: &[String], min: usize, max: usize) -> Result<(), String> {
    if items.len() < min || items.len() > max {
        return Err(format!(
            "{field} must have between {min} and {max} items, got {}",
            items.len()
        ));
    }
    if items.iter().any(|item| item.trim().is_empty()) {
        return Err(format!("{field} must not contain empty items"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_seed() -> ActivitySeed {
        ActivitySeed {
            activity_type: "reflection".to_string(),
            prompt: "Explain the water cycle in your own words".to_string(),
            expected_evidence: vec![
                "names evaporation and condensation".to_string(),
                "orders the stages correctly".to_string(),
            ],
        }
    }

    fn sample_plan() -> LessonPlan {
        LessonPlan {
            lesson_title: "The Water Cycle".to_string(),
            learning_objective: "Describe how water moves through the environment".to_string(),
            key_concepts: vec!["evaporation".to_string(), "condensation".to_string()],
            lesson_outline: vec![
                "Hook: where did the puddle go?".to_string(),
                "The three stages".to_string(),
                "Tracing a raindrop".to_string(),
            ],
            suggested_activity: sample_seed(),
            mastery_criteria: vec![
                "Names all three stages".to_string(),
                "Explains what drives evaporation".to_string(),
            ],
        }
    }

    #[test]
    fn valid_plan_passes() {
        assert!(sample_plan().validate().is_ok());
    }

    #[test]
    fn plan_with_single_key_concept_is_rejected() {
        let mut plan = sample_plan();
        plan.key_concepts.truncate(1);
        let err = plan.validate().unwrap_err();
        assert!(err.contains("key_concepts"), "unexpected error: {err}");
    }

    #[test]
    fn plan_with_blank_outline_item_is_rejected() {
        let mut plan = sample_plan();
        plan.lesson_outline[1] = "   ".to_string();
        let err = plan.validate().unwrap_err();
        assert!(err.contains("lesson_outline"), "unexpected error: {err}");
    }

    #[test]
    fn short_lesson_body_is_rejected() {
        let content = LessonContent {
            lesson_title: "The Water Cycle".to_string(),
            lesson_body: "Too short.".to_string(),
            key_takeaways: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        let err = content.validate().unwrap_err();
        assert!(err.contains("lesson_body"), "unexpected error: {err}");
    }

    #[test]
    fn spec_with_too_many_hints_is_rejected() {
        let spec = ActivitySpec {
            activity_type: "quiz".to_string(),
            instructions: "Answer every question below in complete sentences before checking your work.".to_string(),
            prompt: "What drives the water cycle?".to_string(),
            scoring_rubric: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            hints: vec!["h".to_string(); 6],
        };
        let err = spec.validate().unwrap_err();
        assert!(err.contains("hints"), "unexpected error: {err}");
    }
}
