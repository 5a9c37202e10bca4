//! Gap-aware greedy merger: walks a sorted block array, absorbing the next block into
//! a moving "current" block whenever doing so is cheaper than a second round-trip.

use crate::block::{self, Block};
use crate::cost::CostParams;
use crate::error::Result;
use crate::policy::{self, UnitKind};

/// Merge a sorted, compatible block array using `cost`. Blocks for different
/// (slave, function code) pairs are merged independently within their own run;
/// adjacent blocks from different pairs never combine.
///
/// The output is sorted by `start_address`, non-overlapping, and every output span is
/// a superset of one or more input spans (invariant 2).
pub fn merge_blocks(blocks: &[Block], cost: &CostParams) -> Result<Vec<Block>> {
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let overhead = cost.overhead();
    let mut output = Vec::with_capacity(blocks.len());
    let mut current = blocks[0];

    for &next in &blocks[1..] {
        if should_merge(&current, &next, overhead) {
            current = block::merge(&current, &next)?;
        } else {
            output.push(current);
            current = next;
        }
    }
    output.push(current);

    Ok(output)
}

/// Decide whether `next` should be absorbed into `current`.
///
/// 1. Must be compatible and the function code must support merging.
/// 2. Adjacent blocks merge unconditionally.
/// 3. Otherwise merge iff the gap cost is strictly cheaper than the round-trip overhead.
fn should_merge(current: &Block, next: &Block, overhead: u32) -> bool {
    if !block::compatible(current, next) || !policy::supports_merge(current.function_code) {
        return false;
    }
    let gap = block::gap(current, next);
    if gap == 0 {
        return true;
    }
    let unit_kind = policy::lookup(current.function_code)
        .map(|e| e.unit_kind)
        .unwrap_or(UnitKind::Register);
    crate::cost::should_merge_gap(overhead, gap, unit_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost_params() -> CostParams {
        CostParams {
            req_fixed: 6,
            resp_fixed: 5,
            gap_chars: 4,
            latency_chars: 2,
        }
    }

    #[test]
    fn merge_blocks_empty_input() {
        assert!(merge_blocks(&[], &cost_params()).unwrap().is_empty());
    }

    #[test]
    fn merge_blocks_single_block_passthrough() {
        let b = Block::new(1, 0x03, 100, 3).unwrap();
        let merged = merge_blocks(&[b], &cost_params()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], b);
    }

    #[test]
    fn merge_blocks_scenario_b_beneficial() {
        let a = Block::new(1, 0x03, 100, 3).unwrap();
        let b = Block::new(1, 0x03, 105, 3).unwrap();
        let merged = merge_blocks(&[a, b], &cost_params()).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_address, 100);
        assert_eq!(merged[0].quantity, 8);
    }

    #[test]
    fn merge_blocks_scenario_c_rejected() {
        let a = Block::new(1, 0x03, 100, 3).unwrap();
        let b = Block::new(1, 0x03, 150, 3).unwrap();
        let merged = merge_blocks(&[a, b], &cost_params()).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_blocks_adjacent_always_merges_regardless_of_cost() {
        // Even a zero-overhead cost param must merge adjacent blocks (gap == 0).
        let zero_cost = CostParams {
            req_fixed: 0,
            resp_fixed: 0,
            gap_chars: 0,
            latency_chars: 0,
        };
        let a = Block::new(1, 0x03, 100, 3).unwrap();
        let b = Block::new(1, 0x03, 103, 3).unwrap();
        let merged = merge_blocks(&[a, b], &zero_cost).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn merge_blocks_does_not_cross_slave_boundary() {
        let a = Block::new(1, 0x03, 100, 3).unwrap();
        let b = Block::new(2, 0x03, 103, 3).unwrap();
        let merged = merge_blocks(&[a, b], &cost_params()).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_blocks_never_merges_write_codes() {
        let a = Block::new(1, 0x06, 100, 1).unwrap();
        let b = Block::new(1, 0x06, 101, 1).unwrap();
        let merged = merge_blocks(&[a, b], &cost_params()).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_blocks_output_is_sorted_and_nonoverlapping() {
        let blocks = vec![
            Block::new(1, 0x03, 0, 2).unwrap(),
            Block::new(1, 0x03, 10, 2).unwrap(),
            Block::new(1, 0x03, 200, 2).unwrap(),
        ];
        let merged = merge_blocks(&blocks, &cost_params()).unwrap();
        for pair in merged.windows(2) {
            assert!(pair[0].start_address < pair[1].start_address);
            assert!(pair[0].end() <= u32::from(pair[1].start_address));
        }
    }

    #[test]
    fn merge_blocks_output_count_never_exceeds_input() {
        let blocks = vec![
            Block::new(1, 0x03, 0, 2).unwrap(),
            Block::new(1, 0x03, 2, 2).unwrap(),
            Block::new(1, 0x03, 4, 2).unwrap(),
        ];
        let merged = merge_blocks(&blocks, &cost_params()).unwrap();
        assert!(merged.len() <= blocks.len());
    }
}
