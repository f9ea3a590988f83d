use std::sync::Arc;

use agents::{ActivityRequest, ContentGenerator, GenerationContext, GeneratorError};
use db::{
    DBService,
    models::{
        activity::{Activity, ActivityError, CreateActivity},
        course::{Course, CourseError, CourseStatus},
        lesson::{CreateLesson, Lesson, LessonError, LessonStatus, ObjectiveProgress},
    },
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::services::{
    events::{EventBroadcaster, GenerationEvent},
    progression::{self, ProgressionError},
    tracker::{GenerationGuard, GenerationTracker},
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation already running for course {0}")]
    AlreadyRunning(Uuid),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// Orchestrates generation runs: admits at most one per course, drives
/// the per-objective pipeline on a background task, reports progress
/// through the broadcaster, and classifies the outcome into a final
/// course status.
#[derive(Clone)]
pub struct GenerationService {
    db: DBService,
    tracker: GenerationTracker,
    events: EventBroadcaster,
    generator: Arc<dyn ContentGenerator>,
}

impl GenerationService {
    pub fn new(
        db: DBService,
        tracker: GenerationTracker,
        events: EventBroadcaster,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        GenerationService {
            db,
            tracker,
            events,
            generator,
        }
    }

    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Validate, transition to generating, claim the single-flight slot,
    /// and hand the run off to a background task. Returns the course in
    /// its generating state; progress flows through the broadcaster.
    pub async fn start_generation(&self, course_id: Uuid) -> Result<Course, GenerationError> {
        let course = Course::find_by_id(&self.db.pool, course_id)
            .await?
            .ok_or(CourseError::NotFound)?;

        if self.tracker.is_running(course_id) {
            return Err(GenerationError::AlreadyRunning(course_id));
        }

        let course =
            progression::transition_course(&self.db.pool, &course, CourseStatus::Generating)
                .await?;

        let Some(guard) = self.tracker.try_start(course_id) else {
            // Lost the admission race; the winner's transition already holds.
            return Err(GenerationError::AlreadyRunning(course_id));
        };

        self.events.reset(course_id);

        let service = self.clone();
        let run_course = course.clone();
        tokio::spawn(async move {
            service.run_to_completion(run_course, guard).await;
        });

        Ok(course)
    }

    /// Body of the spawned run. Owns the tracker guard, so the slot is
    /// released on every exit path, panics included.
    async fn run_to_completion(self, course: Course, guard: GenerationGuard) {
        let course_id = course.id;
        let token = guard.cancellation_token();
        let _guard = guard;

        tracing::info!(
            "Starting generation for course {} with {} objectives",
            course_id,
            course.objectives().len()
        );

        let lessons_created = match self.run_pipeline(&course, &token).await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!("Generation failed fatally for course {}: {}", course_id, err);
                self.events.publish(
                    course_id,
                    GenerationEvent::GenerationError {
                        objective_index: -1,
                        error: err.to_string(),
                    },
                );
                0
            }
        };

        let final_status = if lessons_created > 0 {
            CourseStatus::InProgress
        } else {
            CourseStatus::GenerationFailed
        };

        match Course::find_by_id(&self.db.pool, course_id).await {
            Ok(Some(current)) => {
                match progression::transition_course(&self.db.pool, &current, final_status).await {
                    Ok(_) => tracing::info!(
                        "Generation finished for course {}: {} lessons, status {}",
                        course_id,
                        lessons_created,
                        final_status
                    ),
                    Err(err) => tracing::error!(
                        "Failed to finalize status for course {}: {}",
                        course_id,
                        err
                    ),
                }
            }
            Ok(None) => {
                tracing::warn!("Course {} disappeared during generation", course_id);
            }
            Err(err) => {
                tracing::error!(
                    "Failed to reload course {} after generation: {}",
                    course_id,
                    err
                );
            }
        }
    }

    /// Walk the objectives in order. Each objective's failure is isolated
    /// to that objective; the terminal event always carries the number of
    /// lesson rows that exist when the run ends.
    async fn run_pipeline(
        &self,
        course: &Course,
        token: &CancellationToken,
    ) -> Result<i64, GenerationError> {
        let objectives = course.objectives().to_vec();
        let base_context = GenerationContext {
            course_id: course.id,
            course_description: course
                .generated_description
                .clone()
                .or_else(|| course.input_description.clone())
                .unwrap_or_default(),
            all_objectives: objectives.clone(),
            objective_index: None,
            learner_profile: course.learner_profile.as_ref().map(|profile| profile.0.clone()),
        };

        for (index, objective) in objectives.iter().enumerate() {
            if token.is_cancelled() {
                tracing::info!(
                    "Generation for course {} stopping before objective {} (shutdown)",
                    course.id,
                    index
                );
                break;
            }

            let index = index as i64;
            let mut context = base_context.clone();
            context.objective_index = Some(index);

            if let Err(err) = self.run_objective(course.id, index, objective, &context).await {
                tracing::warn!(
                    "Objective {} failed for course {}: {}",
                    index,
                    course.id,
                    err
                );
                self.events.publish(
                    course.id,
                    GenerationEvent::GenerationError {
                        objective_index: index,
                        error: err.to_string(),
                    },
                );
            }
        }

        let lesson_count = Lesson::count_for_course(&self.db.pool, course.id).await?;
        self.events.publish(
            course.id,
            GenerationEvent::GenerationComplete { lesson_count },
        );

        Ok(lesson_count)
    }

    /// One objective's plan, write, create-activity sequence, resuming
    /// from whatever rows a previous run already persisted.
    async fn run_objective(
        &self,
        course_id: Uuid,
        index: i64,
        objective: &str,
        context: &GenerationContext,
    ) -> Result<(), GenerationError> {
        match Lesson::objective_progress(&self.db.pool, course_id, index).await? {
            ObjectiveProgress::Complete => {
                tracing::debug!(
                    "Objective {} of course {} already complete, skipping",
                    index,
                    course_id
                );
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonPlanned {
                        objective_index: index,
                        lesson_title: None,
                        skipped: true,
                    },
                );
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonWritten {
                        objective_index: index,
                        skipped: true,
                    },
                );
                self.events.publish(
                    course_id,
                    GenerationEvent::ActivityCreated {
                        objective_index: index,
                        activity_id: None,
                        activity_type: None,
                        skipped: true,
                    },
                );
            }
            ObjectiveProgress::Partial(lesson) => {
                tracing::debug!(
                    "Objective {} of course {} has a lesson without an activity, resuming",
                    index,
                    course_id
                );
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonPlanned {
                        objective_index: index,
                        lesson_title: None,
                        skipped: true,
                    },
                );
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonWritten {
                        objective_index: index,
                        skipped: true,
                    },
                );

                // No plan survives from the interrupted run, so the
                // activity is created from the stored lesson alone.
                let request = ActivityRequest {
                    objective: objective.to_string(),
                    lesson_content: lesson.lesson_content.clone(),
                    seed: None,
                    mastery_criteria: Vec::new(),
                };
                self.create_activity_step(course_id, index, lesson.id, &request, context)
                    .await?;
            }
            ObjectiveProgress::Absent => {
                let plan = self.generator.plan_lesson(objective, context).await?;
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonPlanned {
                        objective_index: index,
                        lesson_title: Some(plan.lesson_title.clone()),
                        skipped: false,
                    },
                );

                let content = self.generator.write_lesson(&plan, context).await?;
                let status = if index == 0 {
                    LessonStatus::Unlocked
                } else {
                    LessonStatus::Locked
                };
                let lesson = Lesson::create(
                    &self.db.pool,
                    &CreateLesson {
                        course_id,
                        objective_index: index,
                        lesson_content: content.lesson_body.clone(),
                        status,
                    },
                )
                .await?;
                self.events.publish(
                    course_id,
                    GenerationEvent::LessonWritten {
                        objective_index: index,
                        skipped: false,
                    },
                );

                let request = ActivityRequest {
                    objective: objective.to_string(),
                    lesson_content: content.lesson_body,
                    seed: Some(plan.suggested_activity.clone()),
                    mastery_criteria: plan.mastery_criteria.clone(),
                };
                self.create_activity_step(course_id, index, lesson.id, &request, context)
                    .await?;
            }
        }

        Ok(())
    }

    async fn create_activity_step(
        &self,
        course_id: Uuid,
        index: i64,
        lesson_id: Uuid,
        request: &ActivityRequest,
        context: &GenerationContext,
    ) -> Result<(), GenerationError> {
        let spec = self.generator.create_activity(request, context).await?;
        let activity_type = spec.activity_type.clone();

        let activity = Activity::create(
            &self.db.pool,
            &CreateActivity {
                lesson_id,
                activity_spec: spec,
            },
        )
        .await?;

        self.events.publish(
            course_id,
            GenerationEvent::ActivityCreated {
                objective_index: index,
                activity_id: Some(activity.id),
                activity_type: Some(activity_type),
                skipped: false,
            },
        );

        Ok(())
    }
}
