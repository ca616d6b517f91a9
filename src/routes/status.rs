use std::sync::{atomic::Ordering, Arc};

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    constants::{version::get_version, STARTUP_TIME},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: String,
    pub rust: String,
    pub quotes: usize,
    pub uptime_secs: u64,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusReport> {
    let uptime_secs = STARTUP_TIME
        .elapsed()
        .map(|uptime| uptime.as_secs())
        .unwrap_or_default();

    Json(StatusReport {
        version: get_version(),
        rust: rustc_version_runtime::version().to_string(),
        quotes: state.quote_count.load(Ordering::SeqCst),
        uptime_secs,
    })
}
