use std::str::FromStr;

use db::models::course::{Course, CreateCourse};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use uuid::Uuid;

pub(crate) async fn setup_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:?cache=shared")
        .expect("invalid sqlite config")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to open sqlite memory db");

    bootstrap_schema(&pool).await;

    pool
}

async fn bootstrap_schema(pool: &SqlitePool) {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id BLOB PRIMARY KEY,
            source_type TEXT NOT NULL DEFAULT 'custom',
            input_description TEXT,
            input_objectives TEXT NOT NULL DEFAULT '[]',
            learner_profile TEXT,
            generated_description TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            created_at TEXT NOT NULL DEFAULT (datetime('now','subsec')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now','subsec'))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            id BLOB PRIMARY KEY,
            course_id BLOB NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            objective_index INTEGER NOT NULL,
            lesson_content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'locked',
            created_at TEXT NOT NULL DEFAULT (datetime('now','subsec')),
            UNIQUE(course_id, objective_index)
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id BLOB PRIMARY KEY,
            lesson_id BLOB NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            activity_spec TEXT NOT NULL,
            latest_score REAL,
            latest_feedback TEXT,
            mastery_decision TEXT,
            attempt_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now','subsec'))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id BLOB PRIMARY KEY,
            course_id BLOB NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            assessment_spec TEXT,
            score REAL,
            passed INTEGER,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now','subsec'))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS agent_calls (
            id BLOB PRIMARY KEY,
            course_id BLOB NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            agent_name TEXT NOT NULL,
            objective_index INTEGER,
            prompt TEXT NOT NULL,
            output TEXT,
            status TEXT NOT NULL DEFAULT 'running',
            error_message TEXT,
            duration_ms INTEGER,
            input_tokens INTEGER,
            output_tokens INTEGER,
            model_name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now','subsec'))
        );
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .expect("failed to bootstrap schema");
    }
}

pub(crate) async fn create_test_course(pool: &SqlitePool, objectives: &[&str]) -> Course {
    let data = CreateCourse {
        description: Some("Test course".to_string()),
        objectives: objectives.iter().map(|o| o.to_string()).collect(),
        learner_profile: None,
    };

    Course::create(pool, &data, Uuid::new_v4())
        .await
        .expect("failed to create test course")
}
