//! Character-based cost model used to decide whether merging two blocks is cheaper
//! than issuing a second round-trip.

use crate::policy::{self, UnitKind};

/// Transport mode, relevant here only for its default gap/latency characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rtu,
    Ascii,
    Tcp,
}

/// Cost parameters for one optimization run, all in abstract "character" units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostParams {
    pub req_fixed: u32,
    pub resp_fixed: u32,
    pub gap_chars: u32,
    pub latency_chars: u32,
}

impl CostParams {
    /// Derive cost parameters for `function_code` under `mode`, with a caller-supplied
    /// `gap_chars`/`latency_chars` override (pass the spec defaults if the caller has
    /// none: 4/4 for RTU/ASCII gap, 0 for TCP gap; 2 for serial latency, 1 for TCP).
    pub fn derive(
        mode: Mode,
        function_code: u8,
        gap_chars: u32,
        latency_chars: u32,
    ) -> Option<Self> {
        let entry = policy::lookup(function_code)?;
        let gap_chars = match mode {
            Mode::Rtu | Mode::Ascii => gap_chars,
            Mode::Tcp => 0,
        };
        Some(CostParams {
            req_fixed: entry.req_fixed_chars,
            resp_fixed: entry.resp_fixed_chars,
            gap_chars,
            latency_chars,
        })
    }

    /// Overhead per round-trip: `req_fixed + resp_fixed + gap_chars + latency_chars`.
    pub fn overhead(&self) -> u32 {
        self.req_fixed + self.resp_fixed + self.gap_chars + self.latency_chars
    }
}

/// Cost of reading `gap_units` unwanted addressable units of `unit_kind`, in
/// characters. Always the canonical formula — never the policy table's scaled
/// `extra_unit_chars_x100` field (design note 3).
pub fn gap_cost(gap_units: u32, unit_kind: UnitKind) -> u32 {
    match unit_kind {
        UnitKind::Register => gap_units * 2,
        UnitKind::Bit => gap_units.div_ceil(8),
    }
}

/// `overhead - gap_cost`. Merge iff this is strictly positive; no tie-breaking.
pub fn merge_savings(overhead: u32, gap_units: u32, unit_kind: UnitKind) -> i64 {
    i64::from(overhead) - i64::from(gap_cost(gap_units, unit_kind))
}

/// Whether merging across `gap_units` unrequested units is worthwhile given `overhead`.
pub fn should_merge_gap(overhead: u32, gap_units: u32, unit_kind: UnitKind) -> bool {
    merge_savings(overhead, gap_units, unit_kind) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_unknown_fc_is_none() {
        assert!(CostParams::derive(Mode::Tcp, 0x99, 4, 1).is_none());
    }

    #[test]
    fn derive_tcp_zeroes_gap_regardless_of_override() {
        let params = CostParams::derive(Mode::Tcp, 0x03, 4, 1).unwrap();
        assert_eq!(params.gap_chars, 0);
    }

    #[test]
    fn derive_rtu_keeps_gap_override() {
        let params = CostParams::derive(Mode::Rtu, 0x03, 4, 2).unwrap();
        assert_eq!(params.gap_chars, 4);
        assert_eq!(params.latency_chars, 2);
    }

    #[test]
    fn overhead_matches_scenario_b_and_c() {
        // req=6, resp=5, gap=4, lat=2 -> overhead 17
        let params = CostParams {
            req_fixed: 6,
            resp_fixed: 5,
            gap_chars: 4,
            latency_chars: 2,
        };
        assert_eq!(params.overhead(), 17);
    }

    #[test]
    fn gap_cost_register_scenario_b() {
        // 2 unrequested registers between {100,103} end and {105} start
        assert_eq!(gap_cost(2, UnitKind::Register), 4);
    }

    #[test]
    fn gap_cost_register_scenario_c() {
        // gap of 47 registers -> 94 chars
        assert_eq!(gap_cost(47, UnitKind::Register), 94);
    }

    #[test]
    fn merge_beneficial_scenario_b() {
        assert!(should_merge_gap(17, 2, UnitKind::Register));
    }

    #[test]
    fn merge_rejected_scenario_c() {
        assert!(!should_merge_gap(17, 47, UnitKind::Register));
    }

    #[test]
    fn merge_decision_is_monotone_in_gap() {
        // if merge holds at gap g, it holds at all g' < g
        let overhead = 17;
        let kind = UnitKind::Register;
        let max_merging_gap = (0..=20)
            .filter(|&g| should_merge_gap(overhead, g, kind))
            .max()
            .unwrap_or(0);
        for g in 0..=max_merging_gap {
            assert!(should_merge_gap(overhead, g, kind));
        }
    }

    #[test]
    fn zero_savings_does_not_merge() {
        // overhead exactly equal to gap_cost must not merge (savings must be > 0)
        assert!(!should_merge_gap(4, 2, UnitKind::Register));
    }

    #[test]
    fn bit_kind_gap_cost_rounds_up() {
        assert_eq!(gap_cost(1, UnitKind::Bit), 1);
        assert_eq!(gap_cost(8, UnitKind::Bit), 1);
        assert_eq!(gap_cost(9, UnitKind::Bit), 2);
    }
}
