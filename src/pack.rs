//! First-Fit-Decreasing packer: collects merged blocks into PDU-sized bins honoring
//! per-function-code quantity and byte limits.

use crate::block::{self, Block};
use crate::error::{Error, Result};
use crate::policy;
use crate::pool::PoolLimits;

/// An in-progress pack target. Grows monotonically as blocks are folded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduBin {
    pub slave_id: u8,
    pub function_code: u8,
    pub start_address: u16,
    pub quantity: u16,
}

impl PduBin {
    fn from_block(b: &Block) -> Self {
        PduBin {
            slave_id: b.slave_id,
            function_code: b.function_code,
            start_address: b.start_address,
            quantity: b.quantity,
        }
    }

    fn end(&self) -> u32 {
        u32::from(self.start_address) + u32::from(self.quantity)
    }

    pub fn data_bytes(&self) -> u32 {
        let unit_kind = policy::lookup(self.function_code)
            .map(|e| e.unit_kind)
            .unwrap_or(policy::UnitKind::Register);
        block::data_size_of(self.quantity, unit_kind)
    }

    /// Would absorbing `b` keep this bin within `max_pdu_chars` and the FC's max quantity?
    fn can_accept(&self, b: &Block, max_pdu_chars: u32) -> bool {
        if self.slave_id != b.slave_id || self.function_code != b.function_code {
            return false;
        }
        let start = self.start_address.min(b.start_address);
        let end = self.end().max(b.end());
        let quantity = (end - u32::from(start)) as u16;

        let max_qty = policy::max_quantity(self.function_code).unwrap_or(u16::MAX);
        if quantity > max_qty {
            return false;
        }

        let unit_kind = policy::lookup(self.function_code)
            .map(|e| e.unit_kind)
            .unwrap_or(policy::UnitKind::Register);
        block::data_size_of(quantity, unit_kind) <= max_pdu_chars
    }

    fn absorb(&mut self, b: &Block) {
        let start = self.start_address.min(b.start_address);
        let end = self.end().max(b.end());
        self.start_address = start;
        self.quantity = (end - u32::from(start)) as u16;
    }
}

/// Pack `blocks` (already merged) into PDU bins under `max_pdu_chars`.
///
/// Blocks are copied and sorted by quantity descending, then each is placed into the
/// first bin that can accept it; if none can, a fresh bin is opened and checked against
/// `limits.max_pdus` immediately, so a fixed-capacity pool rejects the request as soon
/// as it would need one bin too many. Termination is guaranteed: a bin freshly opened
/// from one block always fits it, since the block itself already satisfied the
/// merger's own quantity/size limits.
pub fn pack_blocks(blocks: &[Block], max_pdu_chars: u32, limits: &PoolLimits) -> Result<Vec<PduBin>> {
    let mut sorted: Vec<Block> = blocks.to_vec();
    sorted.sort_by(|a, b| b.quantity.cmp(&a.quantity));

    let mut bins: Vec<PduBin> = Vec::new();

    for b in &sorted {
        if policy::lookup(b.function_code).is_none() {
            return Err(Error::InvalidFc(b.function_code));
        }
        match bins.iter_mut().find(|bin| bin.can_accept(b, max_pdu_chars)) {
            Some(bin) => bin.absorb(b),
            None => {
                bins.push(PduBin::from_block(b));
                limits.check_pdus(bins.len())?;
            },
        }
    }

    Ok(bins)
}
