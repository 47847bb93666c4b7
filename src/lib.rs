//! intelcache: keeps a community-research digest fresh on disk.
//!
//! A run checks the cache, queries the provider once per topic in parallel,
//! publishes whatever came back and schedules the next refresh.

pub mod config;
pub mod logging;
pub mod refresh;
pub mod render;

pub use config::RefreshConfig;
pub use refresh::{CommandProvider, ProviderCommand, QueryProvider, RefreshCycle, RunReport};
