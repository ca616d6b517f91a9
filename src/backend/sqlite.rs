use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use time::OffsetDateTime;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tracing::Instrument;
use uuid::Uuid;

use super::{BackendError, DecodeError, Delivery, Feed, QuoteBackend, Subscription};
use crate::models::{
    quotes::{Field, NewQuote, Quote},
    snapshot::Snapshot,
};

/// A `quotes` table plus an insert-notification channel. Every notification
/// re-reads the whole ordered table and publishes it to all subscribers.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    feed: Arc<watch::Sender<Feed>>,
    changes: mpsc::UnboundedSender<Uuid>,
    /// Timestamp of the latest insert. Held across the insert so that
    /// `created_at` never goes backwards relative to insertion order.
    clock: Mutex<OffsetDateTime>,
    refresher: std::sync::Mutex<Option<JoinHandle<()>>>,
}

#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: String,
    full_name: String,
    quote: String,
    created_at: i64,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = DecodeError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let id = Uuid::try_parse(&row.id).map_err(|_| DecodeError::Id(row.id.clone()))?;
        let created_at = from_unix_micros(row.created_at)?;

        if row.full_name.trim().is_empty() {
            return Err(DecodeError::EmptyField(Field::FullName));
        }

        if row.quote.trim().is_empty() {
            return Err(DecodeError::EmptyField(Field::Quote));
        }

        Ok(Quote {
            id,
            full_name: row.full_name,
            quote: row.quote,
            created_at,
        })
    }
}

fn from_unix_micros(micros: i64) -> Result<OffsetDateTime, DecodeError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|_| DecodeError::Timestamp(micros))
}

fn to_unix_micros(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000) as i64
}

fn classify(e: sqlx::Error) -> BackendError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => BackendError::Connectivity(e.to_string()),
        other => BackendError::Write(other.to_string()),
    }
}

impl SqliteBackend {
    #[tracing::instrument(skip_all)]
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        tracing::info!("initializing database connection...");

        let in_memory = database_url.contains(":memory:");
        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // an in-memory database lives and dies with its single connection
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(20)
                .acquire_timeout(Duration::from_secs(5))
        };

        let pool = pool_opts.connect_with(opts).await?;

        tracing::info!("running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("finished running migrations!");

        let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM quotes;")
            .fetch_one(&pool)
            .await?;
        let clock = match latest {
            Some(micros) => from_unix_micros(micros)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };

        let (feed, _) = watch::channel(Feed::Pending);
        let feed = Arc::new(feed);
        let (changes, change_rx) = mpsc::unbounded_channel();

        publish(&pool, &feed).await;

        let refresher = tokio::spawn(
            run_refresher(pool.clone(), feed.clone(), change_rx).in_current_span(),
        );

        Ok(SqliteBackend {
            pool,
            feed,
            changes,
            clock: Mutex::new(clock),
            refresher: std::sync::Mutex::new(Some(refresher)),
        })
    }

    /// Re-reads the table and pushes the result to every subscriber.
    pub async fn refresh(&self) {
        publish(&self.pool, &self.feed).await;
    }

    /// Stops the change listener and closes the pool. Open subscriptions
    /// receive a final connectivity failure and keep whatever they last saw.
    #[tracing::instrument(skip_all)]
    pub async fn shutdown(&self) {
        let refresher = self
            .refresher
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();

        if let Some(refresher) = refresher {
            refresher.abort();
        }

        self.pool.close().await;
        self.feed.send_replace(Feed::Delivered(Err(BackendError::Connectivity(
            "backend shut down".into(),
        ))));

        tracing::info!("quote backend shut down");
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl QuoteBackend for SqliteBackend {
    #[tracing::instrument(skip_all, fields(full_name = %quote.full_name()))]
    async fn insert(&self, quote: NewQuote) -> Result<Quote, BackendError> {
        let mut clock = self.clock.lock().await;

        let now = OffsetDateTime::now_utc();
        // stored with microsecond precision, so assign exactly what is stored
        let now = from_unix_micros(to_unix_micros(now)).unwrap_or(now);
        let created_at = now.max(*clock);
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
                INSERT INTO
                    quotes (id, full_name, quote, created_at)
                VALUES
                    ($1, $2, $3, $4);
            "#,
        )
        .bind(id.hyphenated().to_string())
        .bind(quote.full_name())
        .bind(quote.quote())
        .bind(to_unix_micros(created_at))
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(err = ?e, "an error occurred when inserting quote"))
        .map_err(classify)?;

        *clock = created_at;
        drop(clock);

        if self.changes.send(id).is_err() {
            tracing::warn!(id = %id, "change listener is gone, subscribers won't see this quote");
        }

        tracing::info!(id = %id, "added quote");

        Ok(Quote {
            id,
            full_name: quote.full_name().to_string(),
            quote: quote.quote().to_string(),
            created_at,
        })
    }

    async fn subscribe_all(&self) -> Result<Subscription, BackendError> {
        if self.pool.is_closed() {
            return Err(BackendError::Connectivity("backend shut down".into()));
        }

        Ok(Subscription::new(self.feed.subscribe()))
    }
}

async fn run_refresher(
    pool: Pool<Sqlite>,
    feed: Arc<watch::Sender<Feed>>,
    mut changes: mpsc::UnboundedReceiver<Uuid>,
) {
    while let Some(id) = changes.recv().await {
        // every refresh reads the full table, so queued notifications collapse
        let mut coalesced = 0usize;
        while changes.try_recv().is_ok() {
            coalesced += 1;
        }

        tracing::debug!(id = %id, coalesced, "quotes changed, refreshing snapshot");
        publish(&pool, &feed).await;
    }
}

async fn publish(pool: &Pool<Sqlite>, feed: &watch::Sender<Feed>) {
    let delivery = fetch_snapshot(pool).await;
    feed.send_replace(Feed::Delivered(delivery));
}

#[tracing::instrument(skip_all)]
async fn fetch_snapshot(pool: &Pool<Sqlite>) -> Delivery {
    let rows = sqlx::query_as::<_, QuoteRow>(
        r#"
            SELECT
                id, full_name, quote, created_at
            FROM quotes
            ORDER BY created_at DESC, seq DESC;
        "#,
    )
    .fetch_all(pool)
    .await
    .inspect_err(
        |e| tracing::error!(err = ?e, "an error occurred when fetching quotes from database"),
    )
    .map_err(|e| BackendError::Connectivity(e.to_string()))?;

    let quotes = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();

            Quote::try_from(row)
                .inspect_err(|e| tracing::warn!(err = ?e, id = %id, "skipping malformed quote"))
                .ok()
        })
        .collect();

    Ok(Snapshot::new(quotes))
}
