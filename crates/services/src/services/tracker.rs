use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct RunningGeneration {
    token: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Single-flight registry for in-flight generation runs. At most one run
/// exists per course id at any instant; `try_start` is the only admission
/// point and the returned guard is the only release point.
#[derive(Clone)]
pub struct GenerationTracker {
    runs: Arc<Mutex<HashMap<Uuid, RunningGeneration>>>,
    shutdown: CancellationToken,
}

impl Default for GenerationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationTracker {
    pub fn new() -> Self {
        GenerationTracker {
            runs: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Claim the course for a new run. Returns None when a run is already
    /// in flight. The guard releases the claim on drop, panics included,
    /// so it must live on the spawned task for the whole run.
    pub fn try_start(&self, course_id: Uuid) -> Option<GenerationGuard> {
        let mut runs = self.runs.lock().expect("generation tracker lock poisoned");
        if runs.contains_key(&course_id) {
            return None;
        }

        let token = self.shutdown.child_token();
        runs.insert(
            course_id,
            RunningGeneration {
                token: token.clone(),
                started_at: Utc::now(),
            },
        );

        Some(GenerationGuard {
            course_id,
            token,
            tracker: self.clone(),
        })
    }

    pub fn is_running(&self, course_id: Uuid) -> bool {
        self.runs
            .lock()
            .expect("generation tracker lock poisoned")
            .contains_key(&course_id)
    }

    pub fn started_at(&self, course_id: Uuid) -> Option<DateTime<Utc>> {
        self.runs
            .lock()
            .expect("generation tracker lock poisoned")
            .get(&course_id)
            .map(|run| run.started_at)
    }

    /// Cancel every in-flight run's token. Runs stop at the next objective
    /// boundary rather than mid-write.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn finish(&self, course_id: Uuid) {
        let removed = self
            .runs
            .lock()
            .expect("generation tracker lock poisoned")
            .remove(&course_id);
        if let Some(run) = removed {
            run.token.cancel();
        }
    }
}

/// RAII claim on a course's generation slot.
pub struct GenerationGuard {
    course_id: Uuid,
    token: CancellationToken,
    tracker: GenerationTracker,
}

impl GenerationGuard {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.tracker.finish(self.course_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_start_claims_and_drop_releases() {
        let tracker = GenerationTracker::new();
        let course_id = Uuid::new_v4();

        let guard = tracker.try_start(course_id);
        assert!(guard.is_some());
        assert!(tracker.is_running(course_id));
        assert!(tracker.started_at(course_id).is_some());

        drop(guard);
        assert!(!tracker.is_running(course_id));
        assert!(tracker.started_at(course_id).is_none());
    }

    #[tokio::test]
    async fn second_try_start_is_rejected_while_running() {
        let tracker = GenerationTracker::new();
        let course_id = Uuid::new_v4();

        let _guard = tracker.try_start(course_id).unwrap();
        assert!(tracker.try_start(course_id).is_none());
    }

    #[tokio::test]
    async fn concurrent_try_start_admits_exactly_one() {
        let tracker = GenerationTracker::new();
        let course_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move { tracker.try_start(course_id) }));
        }

        let mut guards = Vec::new();
        for handle in handles {
            if let Some(guard) = handle.await.unwrap() {
                guards.push(guard);
            }
        }
        assert_eq!(guards.len(), 1);
    }

    #[tokio::test]
    async fn different_courses_run_concurrently() {
        let tracker = GenerationTracker::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _guard_a = tracker.try_start(a).unwrap();
        let _guard_b = tracker.try_start(b).unwrap();
        assert!(tracker.is_running(a));
        assert!(tracker.is_running(b));
    }

    #[tokio::test]
    async fn guard_releases_even_when_task_panics() {
        let tracker = GenerationTracker::new();
        let course_id = Uuid::new_v4();

        let guard = tracker.try_start(course_id).unwrap();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("pipeline blew up");
        });
        assert!(handle.await.is_err());

        assert!(!tracker.is_running(course_id));
        assert!(tracker.try_start(course_id).is_some());
    }

    #[tokio::test]
    async fn shutdown_cancels_run_tokens() {
        let tracker = GenerationTracker::new();
        let guard = tracker.try_start(Uuid::new_v4()).unwrap();
        let token = guard.cancellation_token();

        assert!(!token.is_cancelled());
        tracker.shutdown();
        assert!(token.is_cancelled());
    }
}
