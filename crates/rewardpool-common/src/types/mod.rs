//! Common data types used throughout the reward pool system

pub mod asset;
pub mod context;

pub use asset::{AssetId, Receipt, Transfer};
pub use context::CallContext;

/// Identity of a staker, admin, treasury or pool instance.
pub type Address = solana_program::pubkey::Pubkey;

/// Reserved registry value marking an empty slot.
pub const SENTINEL_ADDRESS: Address = Address::new_from_array([0u8; 32]);

/// Upper bound on the number of reward assets a single pool distributes.
pub const MAX_REWARD_ASSETS: usize = 5;
