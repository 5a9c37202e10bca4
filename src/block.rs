//! Block utilities: turning an address list into sorted, maximal-run blocks, and the
//! primitive operations (`compatible`, `gap`, `merge`, `data_size`) the merger and
//! packer build on.

use crate::error::{Error, Result};
use crate::policy::{self, UnitKind};
use crate::pool::PoolLimits;

/// A contiguous address range for a single slave and function code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub slave_id: u8,
    pub function_code: u8,
    pub start_address: u16,
    pub quantity: u16,
    pub merged: bool,
}

impl Block {
    pub fn new(slave_id: u8, function_code: u8, start_address: u16, quantity: u16) -> Result<Self> {
        if !(1..=247).contains(&slave_id) {
            return Err(Error::InvalidParam(format!(
                "slave_id {slave_id} out of range [1,247]"
            )));
        }
        let policy = policy::lookup(function_code)
            .ok_or(Error::InvalidFc(function_code))?;
        if quantity == 0 {
            return Err(Error::InvalidQuantity(quantity));
        }
        if quantity > policy.max_quantity {
            return Err(Error::InvalidQuantity(quantity));
        }
        if u32::from(start_address) + u32::from(quantity) > 65536 {
            return Err(Error::InvalidAddress(u32::from(start_address)));
        }
        Ok(Block {
            slave_id,
            function_code,
            start_address,
            quantity,
            merged: false,
        })
    }

    /// Exclusive end of the address span: `start_address + quantity`.
    pub fn end(&self) -> u32 {
        u32::from(self.start_address) + u32::from(self.quantity)
    }

    fn unit_kind(&self) -> UnitKind {
        policy::lookup(self.function_code)
            .map(|e| e.unit_kind)
            .unwrap_or(UnitKind::Register)
    }

    /// Byte cost of this block's data payload: `ceil(q/8)` for bits, `2q` for registers.
    pub fn data_size(&self) -> u32 {
        data_size_of(self.quantity, self.unit_kind())
    }
}

/// Byte cost of `quantity` addressable units of `unit_kind`.
pub fn data_size_of(quantity: u16, unit_kind: UnitKind) -> u32 {
    match unit_kind {
        UnitKind::Bit => u32::from(quantity).div_ceil(8),
        UnitKind::Register => u32::from(quantity) * 2,
    }
}

/// Two blocks are compatible for merging iff they target the same slave and FC.
pub fn compatible(a: &Block, b: &Block) -> bool {
    a.slave_id == b.slave_id && a.function_code == b.function_code
}

/// Count of unrequested addressable units strictly between `a` and `b` (order-independent).
pub fn gap(a: &Block, b: &Block) -> u32 {
    let (earlier, later) = if a.start_address <= b.start_address {
        (a, b)
    } else {
        (b, a)
    };
    let later_start = u32::from(later.start_address);
    later_start.saturating_sub(earlier.end())
}

/// Merge two compatible blocks into their spanning union, marked merged.
///
/// # Errors
/// Returns `InvalidParam` if the blocks are not compatible, and `InvalidQuantity` if
/// the combined span exceeds the function code's maximum quantity.
pub fn merge(a: &Block, b: &Block) -> Result<Block> {
    if !compatible(a, b) {
        return Err(Error::InvalidParam(
            "cannot merge blocks with different slave/function code".to_string(),
        ));
    }
    let start = a.start_address.min(b.start_address);
    let end = a.end().max(b.end());
    let quantity = (end - u32::from(start)) as u16;
    let max_qty = policy::max_quantity(a.function_code).unwrap_or(u16::MAX);
    if quantity > max_qty {
        return Err(Error::InvalidQuantity(quantity));
    }
    Ok(Block {
        slave_id: a.slave_id,
        function_code: a.function_code,
        start_address: start,
        quantity,
        merged: true,
    })
}

/// Turn an unordered address list into a sorted list of maximal-run blocks.
///
/// Duplicate addresses collapse. An empty input produces zero blocks (success).
/// Each run pushed onto the result is checked against `limits.max_blocks` as soon as
/// it is formed, so a fixed-capacity pool rejects the request before the rest of the
/// address list is folded.
pub fn addresses_to_blocks(
    addresses: &[u16],
    slave_id: u8,
    function_code: u8,
    limits: &PoolLimits,
) -> Result<Vec<Block>> {
    if policy::lookup(function_code).is_none() {
        return Err(Error::InvalidFc(function_code));
    }
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let mut sorted: Vec<u16> = addresses.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut blocks = Vec::new();
    let mut run_start = sorted[0];
    let mut run_len: u16 = 1;

    for window in sorted.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if u32::from(next) == u32::from(prev) + 1 {
            run_len += 1;
        } else {
            blocks.push(Block::new(slave_id, function_code, run_start, run_len)?);
            limits.check_blocks(blocks.len())?;
            run_start = next;
            run_len = 1;
        }
    }
    blocks.push(Block::new(slave_id, function_code, run_start, run_len)?);
    limits.check_blocks(blocks.len())?;

    Ok(blocks)
}
