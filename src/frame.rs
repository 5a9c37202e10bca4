//! Frame encoders/decoders for RTU, ASCII, and TCP, and the mode dispatcher.

use crate::checksum::{crc16, crc16_verify, lrc, lrc_verify};
use crate::error::{Error, Result};
use crate::pdu::{Pdu, MAX_PDU_SIZE};
use tracing::{debug, trace, warn};

/// Transport variant. Disabled variants (by cargo feature) return `NotSupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Rtu,
    Ascii,
    Tcp,
}

/// A decoded frame's contents, plus the TCP transaction id when applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub slave_id: u8,
    pub function_code: u8,
    pub pdu: Pdu,
    pub transaction_id: Option<u16>,
}

/// Encode `(slave_id, function_code, pdu_bytes)` into a full wire frame for `mode`.
pub fn encode(mode: TransportMode, slave_id: u8, pdu_bytes: &[u8], transaction_id: u16) -> Result<Vec<u8>> {
    match mode {
        TransportMode::Rtu => encode_rtu(slave_id, pdu_bytes),
        TransportMode::Ascii => encode_ascii(slave_id, pdu_bytes),
        TransportMode::Tcp => encode_tcp(slave_id, pdu_bytes, transaction_id),
    }
}

/// Decode a wire frame for `mode` into its constituent parts.
pub fn decode(mode: TransportMode, frame: &[u8]) -> Result<DecodedFrame> {
    match mode {
        TransportMode::Rtu => decode_rtu(frame),
        TransportMode::Ascii => decode_ascii(frame),
        TransportMode::Tcp => decode_tcp(frame),
    }
}

fn validate_pdu_len(pdu_bytes: &[u8]) -> Result<()> {
    if pdu_bytes.len() > MAX_PDU_SIZE {
        return Err(Error::InvalidParam(format!(
            "pdu length {} exceeds max {}",
            pdu_bytes.len(),
            MAX_PDU_SIZE
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------------
// RTU: [slave][fc][pdu...][crc_lo][crc_hi]
// ---------------------------------------------------------------------------------

#[cfg(feature = "modbus-rtu")]
fn encode_rtu(slave_id: u8, pdu_bytes: &[u8]) -> Result<Vec<u8>> {
    validate_pdu_len(pdu_bytes)?;
    let mut frame = Vec::with_capacity(pdu_bytes.len() + 4);
    frame.push(slave_id);
    frame.extend_from_slice(pdu_bytes);
    let crc = crc16(&frame);
    frame.push((crc & 0xFF) as u8);
    frame.push((crc >> 8) as u8);
    trace!(slave_id, len = frame.len(), "encoded RTU frame");
    Ok(frame)
}

#[cfg(not(feature = "modbus-rtu"))]
fn encode_rtu(_slave_id: u8, _pdu_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(Error::not_supported("RTU transport disabled"))
}

#[cfg(feature = "modbus-rtu")]
fn decode_rtu(frame: &[u8]) -> Result<DecodedFrame> {
    if frame.len() < 4 {
        return Err(Error::invalid_frame(format!(
            "RTU frame too short: {} bytes",
            frame.len()
        )));
    }
    let (ok, computed) = crc16_verify(frame);
    if !ok {
        let expected = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
        warn!(expected, computed, "RTU CRC mismatch");
        return Err(Error::CrcMismatch { expected, computed });
    }
    let slave_id = frame[0];
    let pdu_bytes = &frame[1..frame.len() - 2];
    let pdu = Pdu::from_slice(pdu_bytes)?;
    let function_code = pdu.function_code().unwrap_or(0);
    debug!(slave_id, function_code, "decoded RTU frame");
    Ok(DecodedFrame {
        slave_id,
        function_code,
        pdu,
        transaction_id: None,
    })
}

#[cfg(not(feature = "modbus-rtu"))]
fn decode_rtu(_frame: &[u8]) -> Result<DecodedFrame> {
    Err(Error::not_supported("RTU transport disabled"))
}

// ---------------------------------------------------------------------------------
// ASCII: [':'][slave(2 hex)][fc(2 hex)]{pdu byte -> 2 hex}[lrc(2 hex)][CR][LF]
// ---------------------------------------------------------------------------------

#[cfg(feature = "modbus-ascii")]
fn encode_ascii(slave_id: u8, pdu_bytes: &[u8]) -> Result<Vec<u8>> {
    validate_pdu_len(pdu_bytes)?;
    let mut body = Vec::with_capacity(pdu_bytes.len() + 1);
    body.push(slave_id);
    body.extend_from_slice(pdu_bytes);
    let check = lrc(&body);

    let mut frame = Vec::with_capacity(1 + body.len() * 2 + 2 + 2);
    frame.push(b':');
    for byte in &body {
        push_hex_upper(&mut frame, *byte);
    }
    push_hex_upper(&mut frame, check);
    frame.push(b'\r');
    frame.push(b'\n');
    trace!(slave_id, len = frame.len(), "encoded ASCII frame");
    Ok(frame)
}

#[cfg(not(feature = "modbus-ascii"))]
fn encode_ascii(_slave_id: u8, _pdu_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(Error::not_supported("ASCII transport disabled"))
}

fn push_hex_upper(out: &mut Vec<u8>, byte: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push(HEX[(byte >> 4) as usize]);
    out.push(HEX[(byte & 0x0F) as usize]);
}

fn hex_nibble(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::invalid_frame(format!("invalid hex digit: {c:#04x}"))),
    }
}

fn decode_hex_byte(hi: u8, lo: u8) -> Result<u8> {
    Ok((hex_nibble(hi)? << 4) | hex_nibble(lo)?)
}

#[cfg(feature = "modbus-ascii")]
fn decode_ascii(frame: &[u8]) -> Result<DecodedFrame> {
    if frame.len() < 9 {
        return Err(Error::invalid_frame(format!(
            "ASCII frame too short: {} bytes",
            frame.len()
        )));
    }
    if frame[0] != b':' {
        return Err(Error::invalid_frame("ASCII frame missing ':' start byte"));
    }
    let tail = &frame[frame.len() - 2..];
    if tail != b"\r\n" {
        return Err(Error::invalid_frame("ASCII frame missing CRLF terminator"));
    }

    let hex_body = &frame[1..frame.len() - 2];
    if hex_body.len() % 2 != 0 {
        return Err(Error::invalid_frame("ASCII frame has odd hex digit count"));
    }

    let mut bytes = Vec::with_capacity(hex_body.len() / 2);
    for pair in hex_body.chunks_exact(2) {
        bytes.push(decode_hex_byte(pair[0], pair[1])?);
    }

    if bytes.len() < 3 {
        return Err(Error::invalid_frame("ASCII frame decodes to too few bytes"));
    }

    let (body, check_byte) = bytes.split_at(bytes.len() - 1);
    let check_byte = check_byte[0];
    let computed = lrc(body);
    if computed != check_byte {
        warn!(expected = check_byte, computed, "ASCII LRC mismatch");
        return Err(Error::LrcMismatch {
            expected: check_byte,
            computed,
        });
    }

    let slave_id = body[0];
    let pdu_bytes = &body[1..];
    let pdu = Pdu::from_slice(pdu_bytes)?;
    let function_code = pdu.function_code().unwrap_or(0);
    debug!(slave_id, function_code, "decoded ASCII frame");
    Ok(DecodedFrame {
        slave_id,
        function_code,
        pdu,
        transaction_id: None,
    })
}

#[cfg(not(feature = "modbus-ascii"))]
fn decode_ascii(_frame: &[u8]) -> Result<DecodedFrame> {
    Err(Error::not_supported("ASCII transport disabled"))
}

// ---------------------------------------------------------------------------------
// TCP (MBAP): [tx_hi][tx_lo][0x00][0x00][len_hi][len_lo][unit][fc][pdu...]
// ---------------------------------------------------------------------------------

#[cfg(feature = "modbus-tcp")]
fn encode_tcp(slave_id: u8, pdu_bytes: &[u8], transaction_id: u16) -> Result<Vec<u8>> {
    validate_pdu_len(pdu_bytes)?;
    let len = 2 + pdu_bytes.len();
    if len > 0xFFFF {
        return Err(Error::InvalidParam("MBAP length overflow".to_string()));
    }
    let mut frame = Vec::with_capacity(7 + pdu_bytes.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&(len as u16).to_be_bytes());
    frame.push(slave_id);
    frame.extend_from_slice(pdu_bytes);
    trace!(slave_id, transaction_id, len = frame.len(), "encoded TCP frame");
    Ok(frame)
}

#[cfg(not(feature = "modbus-tcp"))]
fn encode_tcp(_slave_id: u8, _pdu_bytes: &[u8], _transaction_id: u16) -> Result<Vec<u8>> {
    Err(Error::not_supported("TCP transport disabled"))
}

#[cfg(feature = "modbus-tcp")]
fn decode_tcp(frame: &[u8]) -> Result<DecodedFrame> {
    if frame.len() < 8 {
        return Err(Error::invalid_frame(format!(
            "TCP frame too short: {} bytes",
            frame.len()
        )));
    }
    let transaction_id = u16::from_be_bytes([frame[0], frame[1]]);
    let protocol_id = u16::from_be_bytes([frame[2], frame[3]]);
    if protocol_id != 0x0000 {
        return Err(Error::invalid_frame(format!(
            "unexpected MBAP protocol id: {protocol_id:#06x}"
        )));
    }
    let len = u16::from_be_bytes([frame[4], frame[5]]) as usize;
    if frame.len() != 6 + len {
        return Err(Error::invalid_frame(format!(
            "MBAP length mismatch: header says {}, frame has {} trailing bytes",
            len,
            frame.len() - 6
        )));
    }
    let slave_id = frame[6];
    let pdu_bytes = &frame[7..];
    let pdu = Pdu::from_slice(pdu_bytes)?;
    let function_code = pdu.function_code().unwrap_or(0);
    debug!(slave_id, function_code, transaction_id, "decoded TCP frame");
    Ok(DecodedFrame {
        slave_id,
        function_code,
        pdu,
        transaction_id: Some(transaction_id),
    })
}

#[cfg(not(feature = "modbus-tcp"))]
fn decode_tcp(_frame: &[u8]) -> Result<DecodedFrame> {
    Err(Error::not_supported("TCP transport disabled"))
}
