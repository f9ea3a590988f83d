use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use db::models::{
    activity::Activity,
    agent_call::AgentCall,
    course::{Course, CourseStatus, CreateCourse},
    lesson::Lesson,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::progression;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Serialize, ts_rs::TS)]
#[ts(export)]
pub struct CourseSummary {
    pub course: Course,
    pub lesson_count: i64,
    pub lessons_completed: i64,
}

#[derive(Debug, Serialize, ts_rs::TS)]
#[ts(export)]
pub struct LessonWithActivities {
    pub lesson: Lesson,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize, ts_rs::TS)]
#[ts(export)]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<LessonWithActivities>,
}

pub async fn get_courses(
    Query(query): Query<ListCoursesQuery>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<CourseSummary>>>, ApiError> {
    let pool = &deployment.db().pool;
    let courses = Course::find_all(pool, query.status).await?;

    let mut summaries = Vec::with_capacity(courses.len());
    for course in courses {
        let lesson_count = Lesson::count_for_course(pool, course.id).await?;
        let lessons_completed = Lesson::count_completed_for_course(pool, course.id).await?;
        summaries.push(CourseSummary {
            course,
            lesson_count,
            lessons_completed,
        });
    }

    Ok(ResponseJson(ApiResponse::success(summaries)))
}

pub async fn create_course(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateCourse>,
) -> Result<ResponseJson<ApiResponse<Course>>, ApiError> {
    let course = Course::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    tracing::info!(
        "Created course {} with {} objectives",
        course.id,
        course.objectives().len()
    );
    Ok(ResponseJson(ApiResponse::success(course)))
}

pub async fn get_course(
    Path(course_id): Path<Uuid>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<CourseDetail>>, ApiError> {
    let pool = &deployment.db().pool;
    let course = Course::find_by_id(pool, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let mut lessons = Vec::new();
    for lesson in Lesson::find_by_course(pool, course_id).await? {
        let activities = Activity::find_by_lesson(pool, lesson.id).await?;
        lessons.push(LessonWithActivities { lesson, activities });
    }

    Ok(ResponseJson(ApiResponse::success(CourseDetail {
        course,
        lessons,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub target_state: CourseStatus,
}

pub async fn update_course_state(
    Path(course_id): Path<Uuid>,
    Query(query): Query<StateQuery>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Course>>, ApiError> {
    let pool = &deployment.db().pool;
    let course = Course::find_by_id(pool, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let updated = progression::transition_course(pool, &course, query.target_state).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn delete_course(
    Path(course_id): Path<Uuid>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Course::delete(&deployment.db().pool, course_id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn generate_course(
    Path(course_id): Path<Uuid>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Course>>, ApiError> {
    let course = deployment.generation().start_generation(course_id).await?;
    Ok(ResponseJson(ApiResponse::success(course)))
}

pub async fn get_course_agent_calls(
    Path(course_id): Path<Uuid>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<AgentCall>>>, ApiError> {
    let calls = AgentCall::find_by_course(&deployment.db().pool, course_id).await?;
    Ok(ResponseJson(ApiResponse::success(calls)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let course_id_router = Router::new()
        .route("/", get(get_course).delete(delete_course))
        .route("/state", patch(update_course_state))
        .route("/generate", post(generate_course))
        .route("/agent-calls", get(get_course_agent_calls))
        .merge(crate::routes::events::router(deployment));

    Router::new()
        .route("/courses", get(get_courses).post(create_course))
        .nest("/courses/{id}", course_id_router)
}
