pub mod keys;
pub mod query;
pub mod state;

pub use keys::{CacheKey, Tag};
pub use query::{CacheConfig, QueryCache, QuerySubscription};
pub use state::{QueryState, QueryStatus};

use crate::config::Config;

impl From<&Config> for CacheConfig {
    fn from(config: &Config) -> Self {
        CacheConfig::new(config.keep_unused_data_for)
    }
}
