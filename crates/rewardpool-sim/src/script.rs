//! Scenario scripts: a pool label, a start time and an ordered list of
//! entry-point calls. Callers are named by label or by base58 address.

use {
    anyhow::{Context, Result},
    rewardpool_common::{
        utils::{address_from_label, string_to_address},
        Address, AssetId,
    },
    serde::{Deserialize, Serialize},
    std::{fs, path::Path},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default = "default_pool_label")]
    pub pool: String,

    /// Initial host clock in unix seconds
    #[serde(default)]
    pub start_time: u64,

    pub steps: Vec<Step>,
}

fn default_pool_label() -> String {
    "pool".to_string()
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// A base58 address when it parses as one, otherwise the label's derived
/// address.
pub fn resolve(name: &str) -> Address {
    string_to_address(name).unwrap_or_else(|_| address_from_label(name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Credit a holder on the host ledger
    Fund {
        holder: String,
        asset: AssetId,
        amount: u64,
    },
    AdvanceClock {
        seconds: u64,
    },
    /// Native consensus rewards landing on the pool account
    ConsensusReward {
        amount: u64,
    },
    Stake {
        caller: String,
        amount: u64,
        #[serde(default)]
        lock: Option<u64>,
    },
    Claim {
        caller: String,
    },
    Unstake {
        caller: String,
        /// 0 withdraws everything
        #[serde(default)]
        amount: u64,
    },
    AdminUnstake {
        caller: String,
        staker: String,
        #[serde(default)]
        amount: u64,
    },
    Inject {
        caller: String,
        asset: AssetId,
        amount: u64,
    },
    Accrue {
        caller: String,
    },
    AccrueBatch {
        caller: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    MintLst {
        caller: String,
        amount: u64,
    },
    BurnLst {
        caller: String,
        amount: u64,
    },
    ConvertToLst {
        caller: String,
        amount: u64,
    },
    FundLstReserve {
        caller: String,
        amount: u64,
    },
    PickupNativeRewards,
    PayCommission {
        caller: String,
    },
    SetPrices {
        caller: String,
        stake_price: u64,
        second_price: u64,
    },
    SetFreeze {
        caller: String,
        freeze: bool,
    },
    SetPoolActive {
        caller: String,
        active: bool,
    },
    UpdateCommission {
        caller: String,
        commission_bps: u64,
    },
    UpdateMinimumReservedBalance {
        caller: String,
        balance: u64,
    },
    UpdateAdminAddress {
        caller: String,
        admin: String,
    },
    UpdateOracleAdmin {
        caller: String,
        oracle_admin: String,
    },
    UpdateTreasury {
        caller: String,
        treasury: String,
    },
    BumpContractVersion {
        caller: String,
    },
    /// Move the pool to a freshly provisioned successor and continue there
    Migrate {
        caller: String,
        successor: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::AdvanceClock { .. } => "advance_clock",
            Step::ConsensusReward { .. } => "consensus_reward",
            Step::Stake { .. } => "stake",
            Step::Claim { .. } => "claim",
            Step::Unstake { .. } => "unstake",
            Step::AdminUnstake { .. } => "admin_unstake",
            Step::Inject { .. } => "inject",
            Step::Accrue { .. } => "accrue",
            Step::AccrueBatch { .. } => "accrue_batch",
            Step::MintLst { .. } => "mint_lst",
            Step::BurnLst { .. } => "burn_lst",
            Step::ConvertToLst { .. } => "convert_to_lst",
            Step::FundLstReserve { .. } => "fund_lst_reserve",
            Step::PickupNativeRewards => "pickup_native_rewards",
            Step::PayCommission { .. } => "pay_commission",
            Step::SetPrices { .. } => "set_prices",
            Step::SetFreeze { .. } => "set_freeze",
            Step::SetPoolActive { .. } => "set_pool_active",
            Step::UpdateCommission { .. } => "update_commission",
            Step::UpdateMinimumReservedBalance { .. } => "update_minimum_reserved_balance",
            Step::UpdateAdminAddress { .. } => "update_admin_address",
            Step::UpdateOracleAdmin { .. } => "update_oracle_admin",
            Step::UpdateTreasury { .. } => "update_treasury",
            Step::BumpContractVersion { .. } => "bump_contract_version",
            Step::Migrate { .. } => "migrate",
        }
    }
}
