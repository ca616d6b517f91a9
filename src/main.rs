use std::sync::{atomic::AtomicUsize, Arc};

use backend::QuoteBackend;
use config::Config;
use constants::STARTUP_TIME;
use routes::Draining;
use submission::DraftLedger;
use time::UtcOffset;
use wall::live::LiveWall;

mod backend;
mod config;
mod constants;
mod floating;
mod init;
mod models;
mod pages;
mod presentation;
mod routes;
mod submission;
mod telemetry;
mod wall;

/// Everything a request handler can reach.
pub struct AppState {
    backend: Arc<dyn QuoteBackend>,
    live: LiveWall,
    /// Latest snapshot size, written by the live wall's count callback.
    quote_count: Arc<AtomicUsize>,
    drafts: DraftLedger,
    draining: Draining,
    config: Config,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = &*STARTUP_TIME;

    // only readable while the process is still single-threaded
    let local_offset = UtcOffset::current_local_offset().ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(init::run(local_offset))
}
