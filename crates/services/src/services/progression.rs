use db::models::{
    assessment::{Assessment, AssessmentError},
    course::{Course, CourseError, CourseStatus},
    lesson::{Lesson, LessonError, LessonStatus},
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("Cannot transition from '{from}' to '{to}'")]
    InvalidTransition { from: CourseStatus, to: CourseStatus },
    #[error("Guard '{guard}' failed for transition '{from}' -> '{to}'")]
    GuardFailed {
        guard: &'static str,
        from: CourseStatus,
        to: CourseStatus,
    },
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    HasObjectives,
    AnyLessonGenerated,
    AllContentGenerated,
    AllLessonsCompleted,
    AssessmentGenerated,
    AssessmentPassed,
}

impl Guard {
    pub fn name(&self) -> &'static str {
        match self {
            Guard::Always => "always",
            Guard::HasObjectives => "has_objectives",
            Guard::AnyLessonGenerated => "any_lesson_generated",
            Guard::AllContentGenerated => "all_content_generated",
            Guard::AllLessonsCompleted => "all_lessons_completed",
            Guard::AssessmentGenerated => "assessment_generated",
            Guard::AssessmentPassed => "assessment_passed",
        }
    }
}

/// Every legal course status edge and the guard it must satisfy. Status
/// writes go through `transition_course`; nothing else mutates status.
pub const TRANSITIONS: &[(CourseStatus, CourseStatus, Guard)] = &[
    (CourseStatus::Draft, CourseStatus::Generating, Guard::HasObjectives),
    (
        CourseStatus::GenerationFailed,
        CourseStatus::Generating,
        Guard::HasObjectives,
    ),
    (
        CourseStatus::Generating,
        CourseStatus::InProgress,
        Guard::AnyLessonGenerated,
    ),
    (
        CourseStatus::Generating,
        CourseStatus::GenerationFailed,
        Guard::Always,
    ),
    (
        CourseStatus::Generating,
        CourseStatus::Active,
        Guard::AllContentGenerated,
    ),
    (CourseStatus::Active, CourseStatus::InProgress, Guard::Always),
    (
        CourseStatus::InProgress,
        CourseStatus::AwaitingAssessment,
        Guard::AllLessonsCompleted,
    ),
    (
        CourseStatus::AwaitingAssessment,
        CourseStatus::AssessmentReady,
        Guard::AssessmentGenerated,
    ),
    (
        CourseStatus::AssessmentReady,
        CourseStatus::Completed,
        Guard::AssessmentPassed,
    ),
    // Retry after a failed assessment.
    (
        CourseStatus::AssessmentReady,
        CourseStatus::AssessmentReady,
        Guard::Always,
    ),
];

pub fn find_transition(from: CourseStatus, to: CourseStatus) -> Option<Guard> {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, guard)| *guard)
}

pub async fn check_guard(
    pool: &SqlitePool,
    course: &Course,
    guard: Guard,
) -> Result<bool, ProgressionError> {
    let satisfied = match guard {
        Guard::Always => true,
        Guard::HasObjectives => !course.objectives().is_empty(),
        Guard::AnyLessonGenerated => Lesson::count_for_course(pool, course.id).await? > 0,
        Guard::AllContentGenerated => {
            let count = Lesson::count_for_course(pool, course.id).await?;
            count > 0 && count == course.objectives().len() as i64
        }
        Guard::AllLessonsCompleted => {
            let total = Lesson::count_for_course(pool, course.id).await?;
            total > 0 && Lesson::count_completed_for_course(pool, course.id).await? == total
        }
        Guard::AssessmentGenerated => Assessment::count_for_course(pool, course.id).await? > 0,
        Guard::AssessmentPassed => Assessment::any_passed_for_course(pool, course.id).await?,
    };

    Ok(satisfied)
}

/// Move the course along one edge of the lifecycle. Rejected transitions
/// leave the stored status untouched.
pub async fn transition_course(
    pool: &SqlitePool,
    course: &Course,
    target: CourseStatus,
) -> Result<Course, ProgressionError> {
    let guard =
        find_transition(course.status, target).ok_or(ProgressionError::InvalidTransition {
            from: course.status,
            to: target,
        })?;

    if !check_guard(pool, course, guard).await? {
        return Err(ProgressionError::GuardFailed {
            guard: guard.name(),
            from: course.status,
            to: target,
        });
    }

    let updated = Course::update_status(pool, course.id, target).await?;
    Ok(updated)
}

/// Unlock the lowest-indexed locked lesson, if any.
pub async fn unlock_next_lesson(
    pool: &SqlitePool,
    course_id: Uuid,
) -> Result<Option<Lesson>, ProgressionError> {
    let Some(lesson) = Lesson::find_next_locked(pool, course_id).await? else {
        return Ok(None);
    };

    let unlocked = Lesson::update_status(pool, lesson.id, LessonStatus::Unlocked).await?;
    Ok(Some(unlocked))
}
