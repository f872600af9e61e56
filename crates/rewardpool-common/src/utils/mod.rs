//! Utility functions and helpers

mod crypto;
mod time;

pub use crypto::{address_from_label, hash_message};
pub use time::{current_timestamp, format_timestamp};

use {crate::types::Address, std::str::FromStr};

pub fn address_to_string(address: &Address) -> String {
    address.to_string()
}

pub fn string_to_address(s: &str) -> crate::Result<Address> {
    Address::from_str(s)
        .map_err(|e| crate::Error::Serialization(format!("invalid address {:?}: {}", s, e)))
}

/// Serializes addresses as base58 strings in human-edited formats (config,
/// scenario scripts) and as raw bytes in binary formats (snapshots).
pub mod address_serde {
    use {
        crate::types::Address,
        serde::{Deserialize, Deserializer, Serialize, Serializer},
        std::str::FromStr,
    };

    pub fn serialize<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            address.to_string().serialize(serializer)
        } else {
            address.to_bytes().serialize(serializer)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_str(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <[u8; 32]>::deserialize(deserializer)?;
            Ok(Address::new_from_array(bytes))
        }
    }
}
