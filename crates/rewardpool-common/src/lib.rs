//! Shared vocabulary for the reward pool workspace: identities, assets,
//! transfer receipts, configuration and the common error type.

pub mod config;
pub mod errors;
pub mod types;
pub mod utils;

pub use config::{LstConfig, PoolConfig, Weighting};
pub use errors::{Error, Result};
pub use types::*;
