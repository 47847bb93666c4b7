pub mod cycle;
pub mod executor;
pub mod fanout;
pub mod gate;
pub mod provider;
pub mod publish;
pub mod report;
pub mod reset;
pub mod schedule;

pub use cycle::{run_prepared, RefreshCycle};
pub use executor::{CommandProvider, QueryProvider};
pub use provider::ProviderCommand;
pub use publish::CachePaths;
pub use report::RunReport;
