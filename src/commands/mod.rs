pub mod catalog;
pub mod context;
pub mod news;

// Re-export command functions for convenience
pub use catalog::{categories, regions, seed, stats};
pub use context::{load_config, AppContext};
pub use news::{article, feed, refresh, search};
