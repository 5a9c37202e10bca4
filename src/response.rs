//! Response parsing: shape-checks read/write response PDUs and recognizes exception
//! responses. Strict per spec (no graceful degradation — see DESIGN.md).

use crate::error::{Error, Result};
use crate::pdu::Pdu;
use crate::policy::{self, UnitKind};

/// Parsed read-response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadData {
    /// FC01/02: one byte per 8 coils, verbatim.
    Bits(Vec<u8>),
    /// FC03/04: one u16 per register, decoded big-endian.
    Registers(Vec<u16>),
}

/// Parse a read response PDU (FC01-04). `expected_quantity` is the quantity that was
/// requested; a mismatched `byte_count` or truncated PDU is `InvalidFrame`.
pub fn parse_read_response(
    pdu: &Pdu,
    function_code: u8,
    expected_quantity: u16,
) -> Result<ReadData> {
    if pdu.is_exception() {
        return Err(Error::ExceptionResponse(
            pdu.exception_code().unwrap_or(0),
        ));
    }

    let entry = policy::lookup(function_code).ok_or(Error::InvalidFc(function_code))?;
    if !entry.is_read {
        return Err(Error::InvalidFc(function_code));
    }

    let data = pdu.as_slice();
    if data.len() < 2 {
        return Err(Error::invalid_frame(format!(
            "read response PDU too short: {} bytes",
            data.len()
        )));
    }
    if data[0] != function_code {
        return Err(Error::invalid_frame(format!(
            "function code mismatch: expected {:#04x}, got {:#04x}",
            function_code, data[0]
        )));
    }

    let byte_count = data[1] as usize;
    let payload = &data[2..];

    match entry.unit_kind {
        UnitKind::Bit => {
            let expected_bytes = (expected_quantity as usize).div_ceil(8);
            if byte_count != expected_bytes || payload.len() != byte_count {
                return Err(Error::invalid_frame(format!(
                    "byte_count mismatch: expected {} bytes for {} coils, got byte_count={} with {} available",
                    expected_bytes, expected_quantity, byte_count, payload.len()
                )));
            }
            Ok(ReadData::Bits(payload.to_vec()))
        },
        UnitKind::Register => {
            let expected_bytes = expected_quantity as usize * 2;
            if byte_count != expected_bytes || payload.len() != byte_count {
                return Err(Error::invalid_frame(format!(
                    "byte_count mismatch: expected {} bytes for {} registers, got byte_count={} with {} available",
                    expected_bytes, expected_quantity, byte_count, payload.len()
                )));
            }
            let registers = payload
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            Ok(ReadData::Registers(registers))
        },
    }
}

/// Expected echo for a write response, used to validate FC05/06/15/16.
#[derive(Debug, Clone, Copy)]
pub enum WriteExpectation {
    /// FC05: expected coil value.
    SingleCoil { address: u16, value: bool },
    /// FC06: expected register value.
    SingleRegister { address: u16, value: u16 },
    /// FC15/16: expected echoed quantity.
    Multiple { address: u16, quantity: u16 },
}

/// Parse and validate a write response PDU (FC05/06/15/16) against what was requested.
pub fn parse_write_response(
    pdu: &Pdu,
    function_code: u8,
    expected: WriteExpectation,
) -> Result<()> {
    if pdu.is_exception() {
        return Err(Error::ExceptionResponse(
            pdu.exception_code().unwrap_or(0),
        ));
    }

    let entry = policy::lookup(function_code).ok_or(Error::InvalidFc(function_code))?;
    if entry.is_read {
        return Err(Error::InvalidFc(function_code));
    }

    let data = pdu.as_slice();
    if data.len() != 5 {
        return Err(Error::invalid_frame(format!(
            "write response PDU must be 5 bytes (fc + 4), got {}",
            data.len()
        )));
    }
    if data[0] != function_code {
        return Err(Error::invalid_frame(format!(
            "function code mismatch: expected {:#04x}, got {:#04x}",
            function_code, data[0]
        )));
    }

    let address = u16::from_be_bytes([data[1], data[2]]);
    let value = u16::from_be_bytes([data[3], data[4]]);

    match expected {
        WriteExpectation::SingleCoil {
            address: exp_addr,
            value: exp_value,
        } => {
            if address != exp_addr {
                return Err(Error::invalid_frame("echoed address mismatch"));
            }
            let echoed = match value {
                0xFF00 => true,
                0x0000 => false,
                _ => {
                    return Err(Error::invalid_frame(format!(
                        "invalid coil echo value: {value:#06x}"
                    )))
                },
            };
            if echoed != exp_value {
                return Err(Error::invalid_frame("echoed coil value mismatch"));
            }
        },
        WriteExpectation::SingleRegister {
            address: exp_addr,
            value: exp_value,
        } => {
            if address != exp_addr || value != exp_value {
                return Err(Error::invalid_frame("echoed register value mismatch"));
            }
        },
        WriteExpectation::Multiple {
            address: exp_addr,
            quantity: exp_qty,
        } => {
            if address != exp_addr || value != exp_qty {
                return Err(Error::invalid_frame("echoed quantity mismatch"));
            }
        },
    }

    Ok(())
}
