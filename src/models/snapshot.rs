use std::{ops::Deref, sync::Arc};

use crate::models::quotes::Quote;

/// The complete quote collection as of one backend push, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    quotes: Arc<[Quote]>,
}

impl Snapshot {
    /// Sorts by `created_at` descending. The sort is stable, so callers that
    /// already hand in newest-first order keep their tie order.
    pub fn new(mut quotes: Vec<Quote>) -> Self {
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Snapshot {
            quotes: quotes.into(),
        }
    }

    /// Page `page` of size `page_size`; empty when out of range.
    pub fn page(&self, page: usize, page_size: usize) -> &[Quote] {
        if page_size == 0 {
            return &[];
        }

        let start = page.saturating_mul(page_size).min(self.quotes.len());
        let end = start.saturating_add(page_size).min(self.quotes.len());

        &self.quotes[start..end]
    }
}

impl Deref for Snapshot {
    type Target = [Quote];

    fn deref(&self) -> &[Quote] {
        &self.quotes
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use super::*;

    fn quote_at(name: &str, created_at: OffsetDateTime) -> Quote {
        Quote {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            quote: format!("{name} says hi"),
            created_at,
        }
    }

    #[test]
    fn snapshot_is_newest_first() {
        let base = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);
        let snapshot = Snapshot::new(vec![
            quote_at("A", base),
            quote_at("C", base + Duration::seconds(2)),
            quote_at("B", base + Duration::seconds(1)),
        ]);

        let names: Vec<_> = snapshot.iter().map(|q| q.full_name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);
        assert!(snapshot
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let at = OffsetDateTime::UNIX_EPOCH;
        let snapshot = Snapshot::new(vec![quote_at("B", at), quote_at("A", at)]);

        assert_eq!(snapshot[0].full_name, "B");
        assert_eq!(snapshot[1].full_name, "A");
    }

    #[test]
    fn pages_slice_the_sorted_set() {
        let base = OffsetDateTime::UNIX_EPOCH;
        let quotes = (0..5)
            .map(|i| quote_at(&i.to_string(), base + Duration::seconds(i)))
            .collect();
        let snapshot = Snapshot::new(quotes);

        assert_eq!(snapshot.page(0, 2).len(), 2);
        assert_eq!(snapshot.page(2, 2).len(), 1);
        assert_eq!(snapshot.page(2, 2)[0].full_name, "0");
        assert!(snapshot.page(3, 2).is_empty());
        assert!(snapshot.page(0, 0).is_empty());
    }
}
