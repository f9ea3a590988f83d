pub mod anthropic;
pub mod generator;
pub mod outputs;
pub mod prompts;

pub use anthropic::AnthropicGenerator;
pub use generator::{
    ActivityRequest, AgentCallRecord, CallRecorder, ContentGenerator, GenerationContext,
    GeneratorError, LearnerProfile,
};
pub use outputs::{ActivitySeed, ActivitySpec, LessonContent, LessonPlan};
