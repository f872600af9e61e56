//! Asset identifiers and the value movements the pool reasons about

use {
    super::Address,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Host-ledger identifier of a fungible asset. Id `0` is the native currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl AssetId {
    pub const NATIVE: AssetId = AssetId(0);

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "native")
        } else {
            write!(f, "asset#{}", self.0)
        }
    }
}

/// An inbound transfer already settled by the host ledger and presented to
/// the pool as proof of payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Receipt {
    /// Ledger-assigned identifier of the settled transfer
    pub id: u64,
    #[serde(with = "crate::utils::address_serde")]
    pub sender: Address,
    #[serde(with = "crate::utils::address_serde")]
    pub receiver: Address,
    pub asset: AssetId,
    pub amount: u64,
}

/// An outbound transfer issued by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(with = "crate::utils::address_serde")]
    pub to: Address,
    pub asset: AssetId,
    pub amount: u64,
}

impl Transfer {
    pub fn new(to: Address, asset: AssetId, amount: u64) -> Self {
        Self { to, asset, amount }
    }
}
