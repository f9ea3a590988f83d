use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use db::models::course::Course;
use deployment::Deployment;
use futures::{
    StreamExt,
    stream::{self, Stream},
};
use std::{convert::Infallible, time::Duration};
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// How long the live stream waits for an event before checking whether
/// the generation is still running.
const LIVE_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Stream generation progress for a course via SSE.
///
/// Replays the full event log of the current run, then follows live
/// events until the terminal event closes the channel. A subscriber that
/// connects after the run finished gets the replay only. When no run is
/// in progress the stream ends at the first idle probe.
pub async fn stream_course_events(
    Path(course_id): Path<Uuid>,
    State(deployment): State<DeploymentImpl>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    Course::find_by_id(&deployment.db().pool, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let subscription = deployment.events().subscribe(course_id);
    let tracker = deployment.tracker().clone();

    let replay = stream::iter(
        subscription
            .replay
            .into_iter()
            .map(|event| Ok(event.to_sse_event())),
    );

    let live = stream::unfold(
        (subscription.live, tracker, course_id),
        |(mut live, tracker, course_id)| async move {
            let receiver = live.as_mut()?;
            match tokio::time::timeout(LIVE_PROBE_INTERVAL, receiver.recv()).await {
                Ok(Some(event)) => Some((Ok(event.to_sse_event()), (live, tracker, course_id))),
                // Channel closed, the run delivered its terminal event
                Ok(None) => None,
                Err(_) => {
                    if tracker.is_running(course_id) {
                        let event = Event::default().comment("keepalive");
                        Some((Ok(event), (live, tracker, course_id)))
                    } else {
                        None
                    }
                }
            }
        },
    );

    Ok(Sse::new(replay.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/events", get(stream_course_events))
}
