use crate::auth::models::CurrentUser;
use crate::error::ErrorResponse;
use crate::services::events::is_visible_to;
use crate::state::ProcessingState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[utoipa::path(
    get,
    path = "/api/videos/events",
    tag = "videos",
    responses(
        (status = 200, description = "Server-sent `started`, `progress` and `completed` events", content_type = "text/event-stream"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(processing), fields(user_id = %user.id))]
pub async fn video_events(
    State(processing): State<ProcessingState>,
    CurrentUser(user): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = processing.events.subscribe();
    tracing::debug!(
        user_id = %user.id,
        subscribers = processing.events.subscriber_count(),
        "Progress event subscriber connected"
    );

    let stream = BroadcastStream::new(receiver).filter_map(move |message| async move {
        match message {
            Ok(event) if is_visible_to(&event, &user) => Some(Ok(Event::default()
                .event(event.name())
                .data(event.payload().to_string()))),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(user_id = %user.id, skipped, "Progress event subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}
