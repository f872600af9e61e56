//! Fixed-capacity staker registry.
//!
//! Occupied records are kept densely packed in `[0, len)`; every slot at or
//! beyond `len` holds the sentinel record. Lookups are linear scans over the
//! occupied prefix, so the cost of any call is bounded by the capacity.

use {
    super::types::StakerRecord,
    crate::{PoolError, Result},
    rewardpool_common::Address,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakerRegistry {
    slots: Vec<StakerRecord>,
    num_stakers: usize,
}

impl StakerRegistry {
    /// Provisions `capacity` sentinel slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![StakerRecord::default(); capacity],
            num_stakers: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.num_stakers
    }

    pub fn is_empty(&self) -> bool {
        self.num_stakers == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_stakers == self.slots.len()
    }

    pub fn find(&self, address: &Address) -> Option<usize> {
        self.occupied().iter().position(|record| record.address == *address)
    }

    /// Places `record` in the first sentinel slot.
    pub fn insert(&mut self, record: StakerRecord) -> Result<usize> {
        if record.is_sentinel() {
            return Err(PoolError::InvalidAmount("cannot register the zero address".into()));
        }
        if self.is_full() {
            return Err(PoolError::RegistryFull {
                capacity: self.capacity(),
            });
        }

        let slot = self
            .slots
            .iter()
            .position(StakerRecord::is_sentinel)
            .ok_or(PoolError::RegistryFull {
                capacity: self.capacity(),
            })?;
        self.slots[slot] = record;
        self.num_stakers += 1;
        Ok(slot)
    }

    pub fn find_or_insert(&mut self, address: Address) -> Result<usize> {
        match self.find(&address) {
            Some(slot) => Ok(slot),
            None => self.insert(StakerRecord::new(address)),
        }
    }

    /// Removes the record at `slot`, moving the last occupied record into
    /// the freed slot.
    pub fn remove(&mut self, slot: usize) -> Result<StakerRecord> {
        if slot >= self.num_stakers {
            return Err(PoolError::InvalidAmount(format!(
                "slot {} is not occupied",
                slot
            )));
        }

        let last = self.num_stakers - 1;
        let removed = self.slots[slot];
        if slot != last {
            self.slots[slot] = self.slots[last];
        }
        self.slots[last] = StakerRecord::default();
        self.num_stakers -= 1;
        Ok(removed)
    }

    pub fn get(&self, slot: usize) -> Option<&StakerRecord> {
        self.occupied().get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut StakerRecord> {
        self.occupied_mut().get_mut(slot)
    }

    pub fn occupied(&self) -> &[StakerRecord] {
        &self.slots[..self.num_stakers]
    }

    pub fn occupied_mut(&mut self) -> &mut [StakerRecord] {
        &mut self.slots[..self.num_stakers]
    }

    /// Raw slot access including sentinel slots.
    pub fn slots(&self) -> &[StakerRecord] {
        &self.slots
    }

    /// Drops every record, keeping the provisioned capacity.
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = StakerRecord::default();
        }
        self.num_stakers = 0;
    }
}
