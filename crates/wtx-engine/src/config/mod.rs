pub mod build;
pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    ExplorationSettings, FilterSpec, OracleProfile, OracleSpec, PrioritizerSpec, RuleSpec,
    WaitProfile, WaitSpec, WaitTiming, WriterSettings,
};
