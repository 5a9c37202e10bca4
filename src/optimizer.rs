//! Request optimizer: pipelines block folding → gap-aware merge → FFD packing into a
//! list of request plans, one plan per on-wire transaction.

use crate::block;
use crate::cost::CostParams;
use crate::error::Result;
use crate::merge;
use crate::pack;
use crate::pool::PoolLimits;

/// The durable output of optimization: one plan = one on-wire transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPlan {
    pub slave_id: u8,
    pub function_code: u8,
    pub start_address: u16,
    pub quantity: u16,
}

impl RequestPlan {
    /// Whether `address` falls within this plan's requested span.
    pub fn contains(&self, address: u16) -> bool {
        let start = u32::from(self.start_address);
        let end = start + u32::from(self.quantity);
        let addr = u32::from(address);
        addr >= start && addr < end
    }

    /// Offset of `address` within this plan's data, if contained.
    pub fn offset_of(&self, address: u16) -> Option<usize> {
        if self.contains(address) {
            Some((address - self.start_address) as usize)
        } else {
            None
        }
    }
}

/// Optimize an address list into a minimal set of request plans.
///
/// Composes `addresses_to_blocks` → `merge_blocks` → `pack_blocks`, enforcing
/// `limits` at each stage so a fixed-capacity pool rejects the request as soon as it
/// would overflow rather than after the full pipeline has run. Plan count never
/// exceeds the input address count (invariant 7).
///
/// Returns the plans together with the block count `addresses_to_blocks` produced
/// before merging, since callers that also want that count (for statistics) would
/// otherwise have to refold the same address list a second time.
pub fn optimize(
    addresses: &[u16],
    slave_id: u8,
    function_code: u8,
    cost: &CostParams,
    max_pdu_chars: u32,
    limits: &PoolLimits,
) -> Result<(Vec<RequestPlan>, usize)> {
    let blocks = block::addresses_to_blocks(addresses, slave_id, function_code, limits)?;
    if blocks.is_empty() {
        return Ok((Vec::new(), 0));
    }
    let original_block_count = blocks.len();
    let merged = merge::merge_blocks(&blocks, cost)?;
    let bins = pack::pack_blocks(&merged, max_pdu_chars, limits)?;
    limits.check_plans(bins.len())?;

    let plans = bins
        .into_iter()
        .map(|bin| RequestPlan {
            slave_id: bin.slave_id,
            function_code: bin.function_code,
            start_address: bin.start_address,
            quantity: bin.quantity,
        })
        .collect();

    Ok((plans, original_block_count))
}
