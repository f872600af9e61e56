use {
    super::Address,
    serde::{Deserialize, Serialize},
};

/// Identity and clock of the current invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The account invoking the entry point
    #[serde(with = "crate::utils::address_serde")]
    pub caller: Address,

    /// Host clock in unix seconds
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }

    /// Context stamped with the local wall clock.
    pub fn now(caller: Address) -> Self {
        Self {
            caller,
            now: crate::utils::current_timestamp().max(0) as u64,
        }
    }
}
