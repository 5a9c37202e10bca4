//! Memory policy for intermediate block/PDU/plan arrays: either a bounded pool (reset
//! at entry, capacity-checked) or unbounded heap growth. Both modes are value-typed
//! `Vec`-backed containers; neither shares ownership of intermediates across the
//! orchestration boundary (§9).

use crate::error::Error;

/// Capacity configuration for the three intermediate arrays an optimization run uses.
///
/// `None` means heap mode: the array grows until the allocator itself fails.
/// `Some(n)` means pool mode: the array is capped at `n` elements and a fixed capacity
/// violation turns into `TooManyBlocks`/`TooManyPlans`/`NoMemory` instead of growing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolLimits {
    pub max_blocks: Option<usize>,
    pub max_pdus: Option<usize>,
    pub max_plans: Option<usize>,
}

impl PoolLimits {
    /// Static-pool defaults used when the `static-pool` feature is enabled and the
    /// caller supplies no explicit capacities.
    #[cfg(feature = "static-pool")]
    pub fn default_pool() -> Self {
        PoolLimits {
            max_blocks: Some(64),
            max_pdus: Some(64),
            max_plans: Some(64),
        }
    }

    /// Unbounded heap mode (the crate default).
    pub fn heap() -> Self {
        PoolLimits::default()
    }

    pub fn check_blocks(&self, len: usize) -> Result<(), Error> {
        match self.max_blocks {
            Some(cap) if len > cap => Err(Error::TooManyBlocks(cap)),
            _ => Ok(()),
        }
    }

    pub fn check_pdus(&self, len: usize) -> Result<(), Error> {
        match self.max_pdus {
            Some(cap) if len > cap => Err(Error::NoMemory),
            _ => Ok(()),
        }
    }

    pub fn check_plans(&self, len: usize) -> Result<(), Error> {
        match self.max_plans {
            Some(cap) if len > cap => Err(Error::TooManyPlans(cap)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_mode_never_rejects() {
        let limits = PoolLimits::heap();
        assert!(limits.check_blocks(1_000_000).is_ok());
        assert!(limits.check_plans(1_000_000).is_ok());
    }

    #[test]
    fn pool_mode_rejects_over_capacity() {
        let limits = PoolLimits {
            max_blocks: Some(4),
            max_pdus: Some(4),
            max_plans: Some(4),
        };
        assert!(limits.check_blocks(4).is_ok());
        assert!(limits.check_blocks(5).is_err());
        assert!(matches!(
            limits.check_plans(5).unwrap_err(),
            Error::TooManyPlans(4)
        ));
    }

    #[cfg(feature = "static-pool")]
    #[test]
    fn default_pool_has_finite_capacities() {
        let limits = PoolLimits::default_pool();
        assert!(limits.max_blocks.is_some());
        assert!(limits.max_pdus.is_some());
        assert!(limits.max_plans.is_some());
    }
}
