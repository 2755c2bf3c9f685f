use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::{
    handlers::ApiError,
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::{timer::TimerEvent, Session},
    services::AppState,
};

/// SSE endpoint for the countdown
/// GET /api/v1/sessions/{id}/stream
pub async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.get(session_id).await?;

    let tick_interval = state.config.sse_tick_interval_ms.max(1);
    tracing::info!(
        "Starting SSE stream: session={}, time_limit={}s, tick_interval={}ms",
        session_id,
        session.time_limit().num_seconds(),
        tick_interval
    );

    let stream = create_timer_stream(state, session, tick_interval);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Keeps the connection gauge honest however the stream ends.
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

/// Emits a tick per interval, derived from the clock each time, then one
/// `time-expired` event and ends.
fn create_timer_stream(
    state: Arc<AppState>,
    session: Session,
    tick_interval_ms: u64,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = ConnectionGuard::open();

    stream::unfold(
        (state, session, guard, true, false),
        move |(state, session, guard, first, final_sent)| async move {
            if final_sent {
                return None;
            }

            if !first {
                sleep(Duration::from_millis(tick_interval_ms)).await;
            }

            let now = state.clock.now();
            let status = session.status_at(now);
            let timer_event = TimerEvent::observe(&session, &status, now);
            let terminal = timer_event.is_terminal();

            if terminal {
                tracing::info!("Timer expired: session={}", session.id);
            }

            let event = Event::default()
                .event(timer_event.event_name())
                .data(timer_event.to_sse_data());

            Some((Ok(event), (state, session, guard, false, terminal)))
        },
    )
}
