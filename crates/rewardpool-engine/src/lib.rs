//! Proportional multi-asset reward pool engine.
//!
//! Stakers lock one asset into a pool, reward assets are injected
//! periodically, and every accrual pass splits the injected balances across
//! the registry in proportion to each staker's weight. The engine also runs
//! a liquid staking token (LST) exchange, commission skimming on native
//! consensus rewards, and migration to a successor pool.

pub mod admin;
pub mod commission;
pub mod ledger;
pub mod lst;
pub mod metrics;
pub mod migration;
pub mod pool;
pub mod rewards;
pub mod staking;

use rewardpool_common::Address;
use thiserror::Error;

pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use metrics::PoolMetrics;
pub use migration::{MigrationFigures, MigrationPackage};
pub use pool::Pool;
pub use rewards::{AccrualCursor, AccrualSummary, PRECISION};
pub use staking::{PoolSnapshot, PoolState, StakerRecord, StakerRegistry};

/// Errors that abort a pool invocation. Every variant is fatal to the call
/// and no state change from that call is retained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Receipt mismatch: {0}")]
    ReceiptMismatch(String),

    #[error("Staker registry is full ({capacity} slots)")]
    RegistryFull { capacity: usize },

    #[error("No staker record for {0}")]
    NotFound(Address),

    #[error("Insufficient stake: requested {requested}, available {available}")]
    InsufficientStake { requested: u64, available: u64 },

    #[error("Insufficient backing: requested {requested}, available {available}")]
    InsufficientBacking { requested: u64, available: u64 },

    #[error("Insufficient rewards: requested {requested}, available {available}")]
    InsufficientRewards { requested: u64, available: u64 },

    #[error("Pool is not active")]
    PoolInactive,

    #[error("Pool is frozen")]
    PoolFrozen,

    #[error("Prices have not been set")]
    PricesNotSet,

    #[error("Pool is already initialized")]
    AlreadyInitialized,

    #[error("Pool is not initialized")]
    NotInitialized,

    #[error("Stake is locked until {unlock_time}")]
    LockActive { unlock_time: u64 },

    #[error("Pool has migrated to {0}")]
    Migrated(Address),

    #[error("Pool does not issue a liquid staking token")]
    LstNotConfigured,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

pub type Result<T> = std::result::Result<T, PoolError>;
