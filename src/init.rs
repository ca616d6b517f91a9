use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::Context;
use time::UtcOffset;
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{signal, SignalKind},
    },
};

use crate::{
    backend::{sqlite::SqliteBackend, QuoteBackend},
    config::Config,
    floating::Rotations,
    routes::{self, Draining},
    submission::DraftLedger,
    telemetry,
    wall::{live::LiveWall, WallView},
    AppState,
};

async fn init_backend(database_url: &str) -> anyhow::Result<Arc<SqliteBackend>> {
    let backend = SqliteBackend::connect(database_url)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when connecting to the database"))
        .context("failed to open the quote database")?;

    Ok(Arc::new(backend))
}

async fn init_live_wall(
    backend: &dyn QuoteBackend,
    config: &Config,
    quote_count: Arc<AtomicUsize>,
) -> anyhow::Result<LiveWall> {
    let view = WallView::new().with_count_callback(move |count| {
        quote_count.store(count, Ordering::SeqCst);
    });
    let rotations = Rotations::new(config.floating.mobile_slots, config.floating.desktop_slots);

    let live = LiveWall::mount(backend, view, rotations, config.floating.rotation_interval)
        .await
        .context("failed to subscribe to quotes")?;

    tracing::info!(
        every = ?config.floating.rotation_interval,
        "initialized floating quote rotation!"
    );

    Ok(live)
}

async fn shutdown_signal() {
    let interrupt = async {
        let _ = ctrl_c().await.inspect_err(
            |e| tracing::error!(err = ?e, "an error occurred when installing the ctrl-c handler"),
        );
        tracing::info!("received ctrl-c, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when installing the terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}

/// Serves until `signal` resolves, then ends open event streams and waits for
/// in-flight requests.
async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    signal: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let draining = state.draining.clone();

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async move {
            signal.await;
            draining.start();
        })
        .await
}

pub async fn run(local_offset: Option<UtcOffset>) -> anyhow::Result<()> {
    let telemetry = telemetry::init_telemetry()?;

    tracing::info!("initializing... please wait warmly.");

    let config = Config::from_env(local_offset)?;
    let backend = init_backend(&config.database_url).await?;
    let quote_count = Arc::new(AtomicUsize::new(0));
    let live = init_live_wall(backend.as_ref(), &config, quote_count.clone()).await?;

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;

    let state = Arc::new(AppState {
        backend: backend.clone(),
        live,
        quote_count,
        drafts: DraftLedger::default(),
        draining: Draining::new(),
        config,
    });

    tracing::info!(address = %state.config.bind_address, "finished initializing!");

    let served = serve(listener, state.clone(), shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when serving requests"));

    match Arc::try_unwrap(state) {
        Ok(state) => state.live.unmount().await,
        Err(_) => tracing::warn!("requests still in flight, dropping the live wall"),
    }
    backend.shutdown().await;
    telemetry.shutdown();

    served.context("server error")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::oneshot,
    };

    use super::*;
    use crate::routes::tests::test_state;

    #[tokio::test]
    async fn shutdown_ends_open_event_streams() {
        let (state, _backend) = test_state().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, state, async move {
            let _ = stopped.await;
        }));

        let mut client = TcpStream::connect(address).await.unwrap();
        client
            .write_all(b"GET /wall/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            let mut buf = [0; 1024];
            while !String::from_utf8_lossy(&received).contains("snapshot") {
                let n = client.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before the first snapshot");
                received.extend_from_slice(&buf[..n]);
            }
        })
        .await
        .expect("no snapshot on the event stream");

        stop.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server kept waiting on the event stream")
            .unwrap()
            .unwrap();
    }
}
