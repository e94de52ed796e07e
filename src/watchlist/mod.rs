pub mod aggregator;
pub mod store;

pub use aggregator::{DashboardRow, WatchlistAggregator};
pub use store::WatchlistStore;
