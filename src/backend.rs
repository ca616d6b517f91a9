use async_trait::async_trait;
use futures::Stream;
use tokio::sync::watch;

use crate::models::{
    quotes::{Field, NewQuote, Quote},
    snapshot::Snapshot,
};

pub mod sqlite;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    #[error("write rejected: {0}")]
    Write(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid quote id {0:?}")]
    Id(String),

    #[error("created_at {0} is out of range")]
    Timestamp(i64),

    #[error("empty {0}")]
    EmptyField(Field),
}

pub type Delivery = Result<Snapshot, BackendError>;

#[derive(Clone, Debug)]
pub(crate) enum Feed {
    Pending,
    Delivered(Delivery),
}

#[async_trait]
pub trait QuoteBackend: Send + Sync {
    async fn insert(&self, quote: NewQuote) -> Result<Quote, BackendError>;

    /// Opens a channel that first yields the current snapshot, then a fresh
    /// snapshot after every insert.
    async fn subscribe_all(&self) -> Result<Subscription, BackendError>;
}

pub struct Subscription {
    feed: Option<watch::Receiver<Feed>>,
    primed: bool,
}

impl Subscription {
    pub(crate) fn new(feed: watch::Receiver<Feed>) -> Self {
        Subscription {
            feed: Some(feed),
            primed: false,
        }
    }

    /// Waits for the next delivery. Returns `None` once the subscription is
    /// closed or the backend has gone away.
    pub async fn next(&mut self) -> Option<Delivery> {
        let feed = self.feed.as_mut()?;

        if !self.primed {
            self.primed = true;

            if let Feed::Delivered(delivery) = &*feed.borrow_and_update() {
                return Some(delivery.clone());
            }
        }

        while feed.changed().await.is_ok() {
            if let Feed::Delivered(delivery) = &*feed.borrow_and_update() {
                return Some(delivery.clone());
            }
        }

        tracing::debug!("quote feed closed by the backend");
        self.feed = None;
        None
    }

    pub fn close(&mut self) {
        if self.feed.take().is_some() {
            tracing::debug!("closed quote subscription");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.feed.is_none()
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|delivery| (delivery, subscription))
        })
    }
}
