use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-pool activity counters.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    stakes: AtomicU64,
    claims: AtomicU64,
    unstakes: AtomicU64,
    accrual_passes: AtomicU64,
    rewards_distributed: AtomicU64,
    lst_minted: AtomicU64,
    lst_burned: AtomicU64,
    rejections: AtomicU64,
}

impl PoolMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn increment_stakes(&self) {
        self.stakes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_claims(&self) {
        self.claims.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unstakes(&self) {
        self.unstakes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_accrual_passes(&self) {
        self.accrual_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rewards_distributed(&self, amount: u64) {
        self.rewards_distributed.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn add_lst_minted(&self, amount: u64) {
        self.lst_minted.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn add_lst_burned(&self, amount: u64) {
        self.lst_burned.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn increment_rejections(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stakes(&self) -> u64 {
        self.stakes.load(Ordering::Relaxed)
    }

    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::Relaxed)
    }

    pub fn unstakes(&self) -> u64 {
        self.unstakes.load(Ordering::Relaxed)
    }

    pub fn accrual_passes(&self) -> u64 {
        self.accrual_passes.load(Ordering::Relaxed)
    }

    pub fn rewards_distributed(&self) -> u64 {
        self.rewards_distributed.load(Ordering::Relaxed)
    }

    pub fn lst_minted(&self) -> u64 {
        self.lst_minted.load(Ordering::Relaxed)
    }

    pub fn lst_burned(&self) -> u64 {
        self.lst_burned.load(Ordering::Relaxed)
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }
}
