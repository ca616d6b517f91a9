pub mod quotes;
pub mod snapshot;
