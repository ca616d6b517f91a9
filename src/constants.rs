use std::sync::LazyLock;

pub mod presentation;
pub mod text;
pub mod version;

pub static STARTUP_TIME: LazyLock<std::time::SystemTime> =
    LazyLock::new(std::time::SystemTime::now);

pub const NAME_MAX_LENGTH: usize = 100;
pub const DEFAULT_QUOTE_MAX_LENGTH: usize = 500;
pub const QUOTE_MAX_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 100..=5_000;

pub const RECENT_DRAFTS: usize = 1024;

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit quote. Please try again.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load quotes. Please refresh the page.";
