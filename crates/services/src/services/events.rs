use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::response::sse::Event;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use ts_rs::TS;
use uuid::Uuid;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Progress events for one generation run, in the order the pipeline
/// produces them. `generation_complete` and a fatal `generation_error`
/// (objective_index -1) are terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum GenerationEvent {
    LessonPlanned {
        objective_index: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        lesson_title: Option<String>,
        skipped: bool,
    },
    LessonWritten {
        objective_index: i64,
        skipped: bool,
    },
    ActivityCreated {
        objective_index: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        activity_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        activity_type: Option<String>,
        skipped: bool,
    },
    GenerationError {
        objective_index: i64,
        error: String,
    },
    GenerationComplete {
        lesson_count: i64,
    },
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::GenerationComplete { .. })
            || matches!(
                self,
                GenerationEvent::GenerationError {
                    objective_index: -1,
                    ..
                }
            )
    }

    pub fn to_sse_event(&self) -> Event {
        Event::default().json_data(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize generation event: {}", e);
            Event::default().comment("serialization error")
        })
    }
}

#[derive(Default)]
struct CourseChannel {
    log: Vec<GenerationEvent>,
    senders: Vec<Sender<GenerationEvent>>,
}

impl CourseChannel {
    fn has_terminal(&self) -> bool {
        self.log.iter().any(GenerationEvent::is_terminal)
    }
}

/// What a subscriber gets: every event published so far, plus a live
/// channel for the rest of the run. `live` is None when the log already
/// ends in a terminal event. Dropping the receiver unsubscribes.
pub struct Subscription {
    pub replay: Vec<GenerationEvent>,
    pub live: Option<Receiver<GenerationEvent>>,
}

/// Per-course append-only event log with live fan-out. Publishing never
/// blocks: a subscriber whose buffer is full is dropped rather than
/// stalling the pipeline or its fellow subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    courses: Arc<Mutex<HashMap<Uuid, CourseChannel>>>,
    buffer_size: usize,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl EventBroadcaster {
    pub fn new(buffer_size: usize) -> Self {
        EventBroadcaster {
            courses: Arc::new(Mutex::new(HashMap::new())),
            buffer_size,
        }
    }

    /// Append to the course log and fan out to live subscribers. After a
    /// terminal event is delivered every live channel is closed.
    pub fn publish(&self, course_id: Uuid, event: GenerationEvent) {
        let mut courses = self.courses.lock().expect("event broadcaster lock poisoned");
        let channel = courses.entry(course_id).or_default();

        channel.log.push(event.clone());

        channel.senders.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "Subscriber buffer full for course {}, dropping subscriber",
                    course_id
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });

        if event.is_terminal() {
            channel.senders.clear();
        }
    }

    /// Replay plus live tail with no gap and no duplicate between them.
    pub fn subscribe(&self, course_id: Uuid) -> Subscription {
        let mut courses = self.courses.lock().expect("event broadcaster lock poisoned");
        let channel = courses.entry(course_id).or_default();

        let replay = channel.log.clone();
        let live = if channel.has_terminal() {
            None
        } else {
            let (tx, rx) = mpsc::channel(self.buffer_size);
            channel.senders.push(tx);
            Some(rx)
        };

        Subscription { replay, live }
    }

    /// Start a fresh log for a new run. Live channels from the previous
    /// run close; their replay was already delivered.
    pub fn reset(&self, course_id: Uuid) {
        let mut courses = self.courses.lock().expect("event broadcaster lock poisoned");
        courses.insert(course_id, CourseChannel::default());
    }

    pub fn log_len(&self, course_id: Uuid) -> usize {
        self.courses
            .lock()
            .expect("event broadcaster lock poisoned")
            .get(&course_id)
            .map(|channel| channel.log.len())
            .unwrap_or(0)
    }
}
