use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::{
    backend::Delivery,
    constants::LOAD_FAILED_MESSAGE,
    models::{quotes::TextDirection, snapshot::Snapshot},
};

pub mod format;
pub mod live;

pub type CountCallback = Box<dyn Fn(usize) + Send + Sync>;

#[derive(Debug, PartialEq, Eq)]
pub enum RenderState<'a> {
    Loading,
    Error { message: &'a str },
    /// `banner` is set when a later delivery failed; the last good snapshot
    /// stays on screen.
    Loaded {
        quotes: &'a Snapshot,
        banner: Option<&'a str>,
    },
}

#[derive(Default)]
pub struct WallView {
    snapshot: Option<Snapshot>,
    error: Option<String>,
    on_count: Option<CountCallback>,
}

impl WallView {
    pub fn new() -> Self {
        WallView::default()
    }

    /// `callback` receives the quote count after every delivered snapshot.
    pub fn with_count_callback(mut self, callback: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_count = Some(Box::new(callback));
        self
    }

    pub fn apply(&mut self, delivery: Delivery) {
        match delivery {
            Ok(snapshot) => {
                let count = snapshot.len();

                self.snapshot = Some(snapshot);
                self.error = None;

                if let Some(on_count) = &self.on_count {
                    on_count(count);
                }
            }
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when fetching quotes");
                self.error = Some(LOAD_FAILED_MESSAGE.to_string());
            }
        }
    }

    pub fn render(&self) -> RenderState<'_> {
        match (&self.snapshot, &self.error) {
            (Some(quotes), banner) => RenderState::Loaded {
                quotes,
                banner: banner.as_deref(),
            },
            (None, Some(message)) => RenderState::Error {
                message: message.as_str(),
            },
            (None, None) => RenderState::Loading,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.len())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WallEntry {
    pub id: Uuid,
    pub full_name: String,
    pub name_direction: TextDirection,
    pub quote: String,
    pub quote_direction: TextDirection,
    pub time_label: String,
}

pub fn entries(snapshot: &Snapshot, now: OffsetDateTime, offset: UtcOffset) -> Vec<WallEntry> {
    snapshot
        .iter()
        .map(|quote| WallEntry {
            id: quote.id,
            full_name: quote.full_name.clone(),
            name_direction: TextDirection::of(&quote.full_name),
            quote: quote.quote.clone(),
            quote_direction: TextDirection::of(&quote.quote),
            time_label: format::format_date_time(quote.created_at, now, offset),
        })
        .collect()
}
