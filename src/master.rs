//! Master orchestrator: for each plan, build frame → transport → decode → parse →
//! accumulate data/stats. Single-threaded and synchronous per master context (§5).

use crate::cost::{CostParams, Mode};
use crate::error::{Error, Result};
use crate::frame::{self, TransportMode};
use crate::optimizer::{self, RequestPlan};
use crate::pdu::PduBuilder;
use crate::policy;
use crate::pool::PoolLimits;
use crate::response::{self, ReadData, WriteExpectation};
use tracing::{debug, warn};

/// The four capabilities the core needs from a caller-owned transport.
///
/// `delay_chars` defaults to a no-op; RTU/ASCII implementations may use it for
/// inter-frame spacing, but the core treats it as optional.
pub trait Transport {
    fn send(&mut self, buf: &[u8]) -> Result<usize>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn delay_chars(&mut self, _n: u32) {}
}

/// Configuration recognized by the master context (§6).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasterConfig {
    pub mode: ConfigMode,
    #[cfg_attr(feature = "serde", serde(default = "default_max_pdu_chars"))]
    pub max_pdu_chars: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub gap_chars: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub latency_chars: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default = "default_timeout_ms"))]
    pub timeout_ms: u64,
}

/// Serializable mirror of `TransportMode` (kept distinct so `frame::TransportMode`
/// stays free of a `serde` dependency when the `serde` feature is off).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigMode {
    Rtu,
    Ascii,
    Tcp,
}

impl From<ConfigMode> for TransportMode {
    fn from(m: ConfigMode) -> Self {
        match m {
            ConfigMode::Rtu => TransportMode::Rtu,
            ConfigMode::Ascii => TransportMode::Ascii,
            ConfigMode::Tcp => TransportMode::Tcp,
        }
    }
}

impl From<ConfigMode> for Mode {
    fn from(m: ConfigMode) -> Self {
        match m {
            ConfigMode::Rtu => Mode::Rtu,
            ConfigMode::Ascii => Mode::Ascii,
            ConfigMode::Tcp => Mode::Tcp,
        }
    }
}

fn default_max_pdu_chars() -> u32 {
    253
}

fn default_timeout_ms() -> u64 {
    1000
}

impl MasterConfig {
    pub fn new(mode: ConfigMode) -> Self {
        MasterConfig {
            mode,
            max_pdu_chars: default_max_pdu_chars(),
            gap_chars: None,
            latency_chars: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    fn gap_chars(&self) -> u32 {
        self.gap_chars.unwrap_or(match self.mode {
            ConfigMode::Rtu | ConfigMode::Ascii => 4,
            ConfigMode::Tcp => 0,
        })
    }

    fn latency_chars(&self) -> u32 {
        self.latency_chars.unwrap_or(match self.mode {
            ConfigMode::Rtu | ConfigMode::Ascii => 2,
            ConfigMode::Tcp => 1,
        })
    }
}

/// Counters updated by the master; writable only here, readable by clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub round_trips: u64,
    /// Successfully parsed responses. Kept distinct from `round_trips` — the source's
    /// double-increment of a single counter is treated as a bug (design note 2).
    pub responses: u64,
    pub optimized_requests: u64,
    pub rounds_saved: u64,
    pub blocks_merged: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Merged read data plus the plans that produced it, in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub plans: Vec<RequestPlan>,
    pub registers: Vec<u16>,
    pub bits: Vec<u8>,
}

impl ReadResult {
    /// Look up the register value at `address`, if it was part of this read.
    ///
    /// Resolves the open question on per-address demultiplexing (decision (a) in
    /// DESIGN.md): merged data is kept in plan order and this walks the plan list to
    /// find which plan's span contains `address`, then indexes into the accumulated
    /// register buffer at that plan's offset.
    pub fn value_at(&self, address: u16) -> Option<u16> {
        let mut offset = 0usize;
        for plan in &self.plans {
            if let Some(local) = plan.offset_of(address) {
                return self.registers.get(offset + local).copied();
            }
            offset += plan.quantity as usize;
        }
        None
    }
}

/// Holds configuration, the outbound TCP transaction counter, and statistics.
/// Borrows block/PDU/plan arrays for the duration of one operation only.
#[derive(Debug)]
pub struct MasterContext {
    config: MasterConfig,
    next_transaction_id: u16,
    stats: Statistics,
    pool_limits: PoolLimits,
}

impl MasterContext {
    pub fn new(config: MasterConfig) -> Self {
        MasterContext {
            config,
            next_transaction_id: 0,
            stats: Statistics::default(),
            pool_limits: PoolLimits::heap(),
        }
    }

    pub fn with_pool_limits(mut self, limits: PoolLimits) -> Self {
        self.pool_limits = limits;
        self
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    fn mode(&self) -> TransportMode {
        self.config.mode.into()
    }

    fn next_tx_id(&mut self) -> u16 {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        id
    }

    fn round_trip(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        pdu_bytes: &[u8],
    ) -> Result<crate::frame::DecodedFrame> {
        let tx_id = self.next_tx_id();
        let request_frame = frame::encode(self.mode(), slave_id, pdu_bytes, tx_id)?;

        transport.delay_chars(self.config.gap_chars());
        let sent = transport.send(&request_frame)?;
        self.stats.bytes_sent += sent as u64;
        self.stats.round_trips += 1;

        let mut response_buf = vec![0u8; max_response_frame_size(self.mode())];
        let received = transport.recv(&mut response_buf)?;
        if received == 0 {
            return Err(Error::Timeout);
        }
        self.stats.bytes_received += received as u64;

        let decoded = frame::decode(self.mode(), &response_buf[..received])?;
        if decoded.slave_id != slave_id {
            return Err(Error::invalid_frame(format!(
                "echoed slave {} does not match requested slave {}",
                decoded.slave_id, slave_id
            )));
        }
        if decoded.pdu.is_exception() {
            let code = decoded.pdu.exception_code().unwrap_or(0);
            warn!(slave_id, tx_id, code, "slave returned exception response");
            return Err(Error::ExceptionResponse(code));
        }

        self.stats.responses += 1;
        debug!(slave_id, tx_id, "round-trip complete");
        Ok(decoded)
    }

    /// Single, contiguous read (FC01-04).
    pub fn read_single(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        function_code: u8,
        start_address: u16,
        quantity: u16,
    ) -> Result<ReadData> {
        let entry = policy::lookup(function_code).ok_or(Error::InvalidFc(function_code))?;
        if !entry.is_read {
            return Err(Error::InvalidFc(function_code));
        }
        if quantity == 0 || quantity > entry.max_quantity {
            return Err(Error::InvalidQuantity(quantity));
        }
        if u32::from(start_address) + u32::from(quantity) > 65536 {
            return Err(Error::InvalidAddress(u32::from(start_address)));
        }

        let pdu = PduBuilder::build_read_request(function_code, start_address, quantity)?;
        let decoded = self.round_trip(transport, slave_id, pdu.as_slice())?;
        response::parse_read_response(&decoded.pdu, function_code, quantity)
    }

    /// Optimized read over a (possibly non-contiguous) address list.
    pub fn read_optimized(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        function_code: u8,
        addresses: &[u16],
    ) -> Result<ReadResult> {
        let cost = CostParams::derive(
            self.config.mode.into(),
            function_code,
            self.config.gap_chars(),
            self.config.latency_chars(),
        )
        .ok_or(Error::InvalidFc(function_code))?;

        let (plans, original_block_count) = optimizer::optimize(
            addresses,
            slave_id,
            function_code,
            &cost,
            self.config.max_pdu_chars,
            &self.pool_limits,
        )?;

        self.stats.optimized_requests += 1;
        self.stats.rounds_saved += original_block_count.saturating_sub(plans.len()) as u64;
        self.stats.blocks_merged += addresses.len().saturating_sub(plans.len()) as u64;

        let mut registers = Vec::new();
        let mut bits = Vec::new();

        for plan in &plans {
            let data = self.read_single(
                transport,
                plan.slave_id,
                plan.function_code,
                plan.start_address,
                plan.quantity,
            )?;
            match data {
                ReadData::Registers(regs) => registers.extend(regs),
                ReadData::Bits(b) => bits.extend(b),
            }
        }

        Ok(ReadResult {
            plans,
            registers,
            bits,
        })
    }

    /// Write a single coil (FC05) and validate the echo.
    pub fn write_single_coil(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        address: u16,
        value: bool,
    ) -> Result<()> {
        let coil_value: u16 = if value { 0xFF00 } else { 0x0000 };
        let pdu = PduBuilder::new()
            .function_code(0x05)
            .address(address)
            .quantity(coil_value)
            .build()?;
        let decoded = self.round_trip(transport, slave_id, pdu.as_slice())?;
        response::parse_write_response(
            &decoded.pdu,
            0x05,
            WriteExpectation::SingleCoil { address, value },
        )
    }

    /// Write a single holding register (FC06) and validate the echo.
    pub fn write_single_register(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        address: u16,
        value: u16,
    ) -> Result<()> {
        let pdu = PduBuilder::new()
            .function_code(0x06)
            .address(address)
            .quantity(value)
            .build()?;
        let decoded = self.round_trip(transport, slave_id, pdu.as_slice())?;
        response::parse_write_response(
            &decoded.pdu,
            0x06,
            WriteExpectation::SingleRegister { address, value },
        )
    }

    /// Write multiple holding registers (FC16), `quantity ∈ [1, 123]`.
    pub fn write_multiple_registers(
        &mut self,
        transport: &mut dyn Transport,
        slave_id: u8,
        start_address: u16,
        values: &[u16],
    ) -> Result<()> {
        let quantity = values.len();
        if quantity == 0 || quantity > 123 {
            return Err(Error::InvalidQuantity(quantity as u16));
        }
        let byte_count = (2 * quantity) as u8;

        let mut builder = PduBuilder::new()
            .function_code(0x10)
            .address(start_address)
            .quantity(quantity as u16)
            .byte(byte_count);
        for &v in values {
            builder = builder.data(&v.to_be_bytes());
        }
        let pdu = builder.build()?;

        let decoded = self.round_trip(transport, slave_id, pdu.as_slice())?;
        response::parse_write_response(
            &decoded.pdu,
            0x10,
            WriteExpectation::Multiple {
                address: start_address,
                quantity: quantity as u16,
            },
        )
    }
}

/// Worst-case frame size for a read response under `mode`, for sizing the receive
/// buffer: MBAP (7) + fc (1) + byte_count (1) + data (253) for TCP; slave+fc+data+crc
/// for RTU; the ASCII hex-doubled equivalent plus `:`/CRLF for ASCII.
fn max_response_frame_size(mode: TransportMode) -> usize {
    match mode {
        TransportMode::Rtu => 1 + 1 + 1 + 253 + 2,
        TransportMode::Tcp => 7 + 1 + 1 + 253,
        TransportMode::Ascii => {
            let body = 1 + 1 + 1 + 253;
            1 + body * 2 + 2 + 2
        },
    }
}
