pub mod checker;
pub mod config;
pub mod driver;
pub mod enumerate;
pub mod equivalence;
pub mod explorer;
pub mod filter;
pub mod generator;
pub mod identify;
pub mod oracle;
pub mod prioritizer;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod selector;
pub mod session;
pub mod state_graph;
pub mod testcase;
pub mod wait;

pub use driver::{Driver, DriverError, DriverFactory, ElementHandle};
pub use explorer::{ExplorationStats, Explorer, ExplorerConfig, ExplorerError};
pub use queue::{Frontier, Partition};
pub use runner::{RunResult, RunnerError, SequenceRunner};
pub use session::Session;
pub use wtx_common;
