use crate::generator::{ActivityRequest, GenerationContext};
use crate::outputs::LessonPlan;

pub const LESSON_PLANNER_SYSTEM: &str = "You are an expert instructional designer creating a lesson plan for one learning objective within a course.

Your job is to produce a structured lesson plan that a downstream lesson writer can use to write complete, engaging lesson content, and that an activity creator can use to design a practice activity.

Requirements:
- lesson_title: A clear, specific title for this lesson (not the course title)
- learning_objective: Restate the objective as a clear, measurable outcome
- key_concepts: 2-8 core concepts the lesson must cover
- lesson_outline: 3-10 ordered steps/sections for the lesson content
- suggested_activity: A seed for a practice activity that tests the objective, including the activity type, a prompt, and 2-5 expected evidence items
- mastery_criteria: 2-6 rubric-style checks for determining mastery

The plan must be specific enough that downstream agents can produce aligned content without guessing. Tailor the plan to the learner's profile if provided.

IMPORTANT - Scope control: You will receive the full list of course objectives. Your lesson must cover ONLY the assigned objective. You may briefly mention related topics to give context (e.g., a single sentence noting they exist), but do NOT teach, define, or provide tables/examples for concepts that belong to a different objective. Those will be covered in their own lessons.

Respond with ONLY a JSON object, no prose and no code fences, using exactly these keys:
{\"lesson_title\": string, \"learning_objective\": string, \"key_concepts\": [string], \"lesson_outline\": [string], \"suggested_activity\": {\"activity_type\": string, \"prompt\": string, \"expected_evidence\": [string]}, \"mastery_criteria\": [string]}";

pub const LESSON_WRITER_SYSTEM: &str = "You are an expert educational content writer. Given a lesson plan, write a complete lesson in Markdown.

Requirements for the lesson body:
- Start with a clear statement of the learning objective
- Explain why this topic matters (real-world relevance)
- Walk through the key concepts with clear steps and explanations
- Include at least one concrete, worked example
- End with a brief recap that ties back to the objective
- Use Markdown headings (##, ###), lists, and code blocks where appropriate
- Write in a clear, engaging voice. Teach, don't lecture
- Minimum 200 characters for the lesson body

Also provide 3-6 concise key takeaways.

Tailor tone, examples, and difficulty to the learner's profile if provided.

Respond with ONLY a JSON object, no prose and no code fences, using exactly these keys:
{\"lesson_title\": string, \"lesson_body\": string, \"key_takeaways\": [string]}";

pub const ACTIVITY_CREATOR_SYSTEM: &str = "You are an expert activity designer for educational courses. Given the lesson and its mastery criteria, create a complete practice activity.

Requirements:
- instructions: Clear, actionable instructions (min 50 chars) telling the learner exactly what to do, including constraints (length, format, required components)
- prompt: The specific question or task (min 20 chars)
- scoring_rubric: 3-6 specific, gradeable criteria that map to the mastery criteria. Each should be checkable (e.g., 'Includes at least 3 examples with explanations')
- hints: 2-5 scaffolding hints that guide without giving the answer

The activity should directly test the learning objective. Make it challenging but achievable. Tailor to the learner's profile if provided.

Respond with ONLY a JSON object, no prose and no code fences, using exactly these keys:
{\"activity_type\": string, \"instructions\": string, \"prompt\": string, \"scoring_rubric\": [string], \"hints\": [string]}";

pub fn lesson_planner_prompt(objective: &str, context: &GenerationContext) -> String {
    let mut prompt = format!(
        "Course description: {}\n\nLearning objective for THIS lesson: {}\n",
        context.course_description, objective
    );
    let other = context.other_objectives(objective);
    if !other.is_empty() {
        prompt.push_str(
            "\nOther objectives in this course (DO NOT teach these, they have their own lessons):\n",
        );
        for objective in other {
            prompt.push_str(&format!("- {objective}\n"));
        }
    }
    append_learner_profile(&mut prompt, context);
    prompt
}

pub fn lesson_writer_prompt(plan: &LessonPlan, context: &GenerationContext) -> String {
    let mut prompt = format!(
        "Course description: {}\n\nLesson plan:\n{}\n",
        context.course_description,
        serde_json::to_string_pretty(plan).unwrap_or_default()
    );
    append_learner_profile(&mut prompt, context);
    prompt
}

pub fn activity_creator_prompt(request: &ActivityRequest, context: &GenerationContext) -> String {
    let mut prompt = format!("Learning objective: {}\n", request.objective);
    if !request.mastery_criteria.is_empty() {
        prompt.push_str("\nMastery criteria:\n");
        for criterion in &request.mastery_criteria {
            prompt.push_str(&format!("- {criterion}\n"));
        }
    }
    if let Some(seed) = &request.seed {
        prompt.push_str(&format!(
            "\nActivity seed:\n{}\n",
            serde_json::to_string_pretty(seed).unwrap_or_default()
        ));
    }
    prompt.push_str(&format!("\nLesson content:\n{}\n", request.lesson_content));
    append_learner_profile(&mut prompt, context);
    prompt
}

fn append_learner_profile(prompt: &mut String, context: &GenerationContext) {
    if let Some(profile) = &context.learner_profile {
        prompt.push_str(&format!(
            "\nLearner profile: {}\n",
            serde_json::to_string_pretty(profile).unwrap_or_default()
        ));
    }
}
