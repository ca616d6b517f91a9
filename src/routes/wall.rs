use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use super::AppError;
use crate::{
    backend::Delivery,
    constants::LOAD_FAILED_MESSAGE,
    models::snapshot::Snapshot,
    pages,
    wall::{self, format::count_label, WallEntry},
    AppState,
};

/// Payload of a `snapshot` event.
#[derive(Debug, Serialize)]
pub struct WallUpdate {
    pub count: usize,
    pub count_label: String,
    pub quotes: Vec<WallEntry>,
}

impl WallUpdate {
    fn new(snapshot: &Snapshot, now: OffsetDateTime, offset: UtcOffset) -> Self {
        WallUpdate {
            count: snapshot.len(),
            count_label: count_label(snapshot.len()),
            quotes: wall::entries(snapshot, now, offset),
        }
    }
}

pub async fn page(State(state): State<Arc<AppState>>) -> Html<String> {
    let live = state.live.read().await;
    let entries = live
        .view
        .snapshot()
        .map(|snapshot| {
            wall::entries(snapshot, OffsetDateTime::now_utc(), state.config.display_offset)
        })
        .unwrap_or_default();

    Html(pages::wall_page(
        live.view.render(),
        &entries,
        &state.config.theme,
        state.config.floating.rotation_interval.as_secs(),
    ))
}

/// Each client gets its own subscription, torn down when it disconnects.
#[tracing::instrument(skip_all)]
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = state.backend.subscribe_all().await.inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when subscribing a wall client"),
    )?;

    let offset = state.config.display_offset;
    let draining = state.draining.clone();
    let stream = subscription
        .into_stream()
        .map(move |delivery| Ok(to_event(delivery, offset)))
        .take_until(async move { draining.started().await });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_event(delivery: Delivery, offset: UtcOffset) -> Event {
    let failure = || Event::default().event("failure").data(LOAD_FAILED_MESSAGE);

    match delivery {
        Ok(snapshot) => {
            let update = WallUpdate::new(&snapshot, OffsetDateTime::now_utc(), offset);

            Event::default()
                .event("snapshot")
                .json_data(&update)
                .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when encoding snapshot"))
                .unwrap_or_else(|_| failure())
        }
        Err(e) => {
            tracing::warn!(err = ?e, "wall client received a failed delivery");
            failure()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::*;
    use crate::{
        backend::BackendError,
        routes::tests::{body_text, seed, test_state},
    };

    #[tokio::test]
    async fn page_renders_newest_first() {
        let (state, backend) = test_state().await;
        seed(&state, &backend, &["First", "Second"]).await;

        let Html(html) = page(State(state)).await;

        assert!(html.contains("2 Quotes"));
        let second = html.find("Second says hi").unwrap();
        let first = html.find("First says hi").unwrap();
        assert!(second < first);
    }

    #[tokio::test]
    async fn page_keeps_quotes_after_disconnect() {
        let (state, backend) = test_state().await;
        seed(&state, &backend, &["A", "B", "C"]).await;
        backend.shutdown().await;

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let Html(html) = page(State(state.clone())).await;
                if !html.contains(&format!(r#"data-failed="{LOAD_FAILED_MESSAGE}" hidden"#)) {
                    assert!(html.contains("3 Quotes"));
                    assert!(html.contains(LOAD_FAILED_MESSAGE));
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("banner never appeared");
    }

    #[tokio::test]
    async fn events_fail_when_backend_is_down() {
        let (state, backend) = test_state().await;
        backend.shutdown().await;

        let response = events(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains("backend unreachable"));
    }

    #[test]
    fn deliveries_map_to_named_events() {
        let snapshot = Snapshot::default();

        let ok = format!("{:?}", to_event(Ok(snapshot), UtcOffset::UTC));
        let err = format!(
            "{:?}",
            to_event(Err(BackendError::Connectivity("gone".into())), UtcOffset::UTC)
        );

        assert!(ok.contains("snapshot"));
        assert!(ok.contains("0 Quotes"));
        assert!(err.contains("failure"));
    }
}
