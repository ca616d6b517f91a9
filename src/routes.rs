use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{backend::BackendError, AppState};

pub mod floating;
pub mod presentation;
pub mod quote_form;
pub mod status;
pub mod wall;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Set once the server starts shutting down; streaming responses end on it.
#[derive(Clone)]
pub struct Draining(Arc<watch::Sender<bool>>);

impl Draining {
    pub fn new() -> Self {
        Draining(Arc::new(watch::Sender::new(false)))
    }

    pub fn start(&self) {
        self.0.send_replace(true);
    }

    pub async fn started(&self) {
        let mut draining = self.0.subscribe();
        let _ = draining.wait_for(|draining| *draining).await;
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Backend(BackendError::Connectivity(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Backend(BackendError::Write(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(quote_form::index))
        .route("/submit", post(quote_form::submit))
        .route("/wall", get(wall::page))
        .route("/wall/events", get(wall::events))
        .route("/floating", get(floating::layout))
        .route("/presentation", get(presentation::slide))
        .route("/status", get(status::status))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use axum::{body::to_bytes, response::Response};
    use time::UtcOffset;

    use super::Draining;
    use crate::{
        backend::{sqlite::SqliteBackend, QuoteBackend},
        config::{Config, FloatingConfig, Theme},
        floating::Rotations,
        models::quotes::{Limits, NewQuote},
        submission::DraftLedger,
        wall::{live::LiveWall, WallView},
        AppState,
    };

    pub(crate) async fn test_state() -> (Arc<AppState>, Arc<SqliteBackend>) {
        let backend = Arc::new(SqliteBackend::connect("sqlite::memory:").await.unwrap());
        let quote_count = Arc::new(AtomicUsize::new(0));
        let counted = quote_count.clone();

        let live = LiveWall::mount(
            backend.as_ref(),
            WallView::new().with_count_callback(move |n| counted.store(n, Ordering::SeqCst)),
            Rotations::new(2, 4),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".parse().unwrap(),
            static_dir: "public".into(),
            limits: Limits::default(),
            display_offset: UtcOffset::UTC,
            theme: Theme::default(),
            floating: FloatingConfig::default(),
        };

        let state = Arc::new(AppState {
            backend: backend.clone(),
            live,
            quote_count,
            drafts: DraftLedger::default(),
            draining: Draining::new(),
            config,
        });

        (state, backend)
    }

    pub(crate) async fn seed(state: &AppState, backend: &SqliteBackend, names: &[&str]) {
        for name in names {
            let quote = NewQuote::new(name, &format!("{name} says hi"), &Limits::default()).unwrap();
            backend.insert(quote).await.unwrap();
        }

        wait_for_count(state, names.len()).await;
    }

    pub(crate) async fn wait_for_count(state: &AppState, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if state.live.read().await.view.snapshot().map(|s| s.len()) == Some(count) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("live wall never caught up");
    }

    pub(crate) async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
