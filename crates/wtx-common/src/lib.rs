pub mod action;
pub mod difference;
pub mod error;
pub mod failure;
pub mod identifier;
pub mod selector;
pub mod sequence;
pub mod state;

pub use action::{Action, ActionKind};
pub use difference::StateDifference;
pub use error::CommonError;
pub use failure::FailureReason;
pub use identifier::{ElementIdentifier, IndexBasis};
pub use selector::{CompositeMode, PropertyMatch, Selector};
pub use sequence::ActionSequence;
pub use state::{CheckerSpec, ElementSnapshot, State};
