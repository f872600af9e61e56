//! Configuration types for a reward pool instance

mod weighting;

pub use weighting::Weighting;

use {
    crate::{
        errors::{Error, Result},
        types::{Address, AssetId, MAX_REWARD_ASSETS, SENTINEL_ADDRESS},
    },
    serde::{Deserialize, Serialize},
    std::{fs, path::Path},
};

/// Largest registry the engine will provision. One full accrual pass over
/// this many slots must fit the host's per-call budget.
pub const MAX_REGISTRY_CAPACITY: usize = 650;

pub const BPS_DENOMINATOR: u64 = 10_000;

pub const DEFAULT_LST_SCALE: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub staked_asset: AssetId,

    #[serde(default)]
    pub reward_assets: Vec<AssetId>,

    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub weighting: Weighting,

    #[serde(default)]
    pub lst: Option<LstConfig>,

    #[serde(default)]
    pub commission_bps: u64,

    #[serde(default)]
    pub minimum_reserved_balance: u64,

    /// Native balance growth at or below this is ignored by reward pickup
    #[serde(default)]
    pub pickup_threshold: u64,

    #[serde(default = "default_batch_size")]
    pub accrual_batch_size: usize,

    #[serde(with = "crate::utils::address_serde")]
    pub admin: Address,

    #[serde(with = "crate::utils::address_serde")]
    pub oracle_admin: Address,

    #[serde(with = "crate::utils::address_serde")]
    pub treasury: Address,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstConfig {
    pub lst_asset: AssetId,

    /// Fixed-point scale of the exchange rate
    #[serde(default = "default_lst_scale")]
    pub scale: u64,
}

fn default_capacity() -> usize {
    MAX_REGISTRY_CAPACITY
}

fn default_batch_size() -> usize {
    MAX_REGISTRY_CAPACITY
}

fn default_lst_scale() -> u64 {
    DEFAULT_LST_SCALE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PoolConfig {
    /// A plain amount-weighted pool with no LST and no commission.
    pub fn new(staked_asset: AssetId, reward_assets: Vec<AssetId>, admin: Address) -> Self {
        Self {
            staked_asset,
            reward_assets,
            capacity: default_capacity(),
            weighting: Weighting::Amount,
            lst: None,
            commission_bps: 0,
            minimum_reserved_balance: 0,
            pickup_threshold: 0,
            accrual_batch_size: default_batch_size(),
            admin,
            oracle_admin: admin,
            treasury: admin,
            log_level: default_log_level(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reward_assets.len() > MAX_REWARD_ASSETS {
            return Err(Error::Config(format!(
                "at most {} reward assets are supported, got {}",
                MAX_REWARD_ASSETS,
                self.reward_assets.len()
            )));
        }
        for (i, asset) in self.reward_assets.iter().enumerate() {
            if self.reward_assets[..i].contains(asset) {
                return Err(Error::Config(format!("duplicate reward asset {}", asset)));
            }
        }
        if self.capacity == 0 || self.capacity > MAX_REGISTRY_CAPACITY {
            return Err(Error::Config(format!(
                "capacity must be within 1..={}, got {}",
                MAX_REGISTRY_CAPACITY, self.capacity
            )));
        }
        if self.accrual_batch_size == 0 {
            return Err(Error::Config("accrual_batch_size must be positive".into()));
        }
        if self.commission_bps > BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "commission_bps must not exceed {}, got {}",
                BPS_DENOMINATOR, self.commission_bps
            )));
        }
        if self.admin == SENTINEL_ADDRESS {
            return Err(Error::Config("admin must not be the zero address".into()));
        }
        if let Some(lst) = &self.lst {
            if lst.scale == 0 {
                return Err(Error::Config("lst scale must be positive".into()));
            }
            if lst.lst_asset == self.staked_asset || self.reward_assets.contains(&lst.lst_asset) {
                return Err(Error::Config(
                    "lst asset must differ from the staked and reward assets".into(),
                ));
            }
        }
        self.weighting.validate()
    }

    pub fn is_compounding(&self, reward_asset: AssetId) -> bool {
        reward_asset == self.staked_asset
    }
}
