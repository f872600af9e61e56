//! Scenario replay for reward pools against an in-memory host ledger

pub mod runner;
pub mod script;

pub use runner::{RunReport, Simulator, StepFailure};
pub use script::{resolve, Script, Step};
