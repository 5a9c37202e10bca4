//! `Pdu`: the function-code-and-payload portion of a Modbus frame.
//!
//! Two memory policies are available (§9 Memory Policy): by default `Pdu` wraps a
//! growable `Vec<u8>`; under the `static-pool` feature it instead wraps a fixed-capacity
//! inline array, so no heap allocation occurs while encoding or decoding frames.

use crate::error::{Error, Result};

/// Maximum PDU payload length a single Modbus frame can carry.
pub const MAX_PDU_SIZE: usize = 253;

#[cfg(not(feature = "static-pool"))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pdu(Vec<u8>);

#[cfg(not(feature = "static-pool"))]
impl Pdu {
    pub fn new() -> Self {
        Pdu(Vec::new())
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: data.len(),
                available: MAX_PDU_SIZE,
            });
        }
        Ok(Pdu(data.to_vec()))
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.0.len() >= MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: self.0.len() + 1,
                available: MAX_PDU_SIZE,
            });
        }
        self.0.push(byte);
        Ok(())
    }

    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)
    }

    pub fn extend(&mut self, data: &[u8]) -> Result<()> {
        if self.0.len() + data.len() > MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: self.0.len() + data.len(),
                available: MAX_PDU_SIZE,
            });
        }
        self.0.extend_from_slice(data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(feature = "static-pool")]
#[derive(Debug, Clone, Copy)]
pub struct Pdu {
    buf: [u8; MAX_PDU_SIZE],
    len: usize,
}

#[cfg(feature = "static-pool")]
impl Default for Pdu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "static-pool")]
impl Pdu {
    pub fn new() -> Self {
        Pdu {
            buf: [0u8; MAX_PDU_SIZE],
            len: 0,
        }
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: data.len(),
                available: MAX_PDU_SIZE,
            });
        }
        let mut pdu = Self::new();
        pdu.buf[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: self.len + 1,
                available: MAX_PDU_SIZE,
            });
        }
        self.buf[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)
    }

    pub fn extend(&mut self, data: &[u8]) -> Result<()> {
        if self.len + data.len() > MAX_PDU_SIZE {
            return Err(Error::BufferTooSmall {
                needed: self.len + data.len(),
                available: MAX_PDU_SIZE,
            });
        }
        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Pdu {
    /// The function code in byte 0, if present.
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    /// Whether the function code has the exception high bit set.
    pub fn is_exception(&self) -> bool {
        self.function_code().is_some_and(|fc| fc & 0x80 != 0)
    }

    /// The Modbus exception code (PDU byte 1), if this is an exception response.
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.as_slice().get(1).copied()
        } else {
            None
        }
    }
}

/// Fluent builder for constructing request/response PDUs.
#[derive(Debug, Default)]
pub struct PduBuilder {
    pdu: Pdu,
    error: Option<Error>,
}

impl PduBuilder {
    pub fn new() -> Self {
        PduBuilder {
            pdu: Pdu::new(),
            error: None,
        }
    }

    pub fn function_code(mut self, fc: u8) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.pdu.push(fc) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn address(mut self, address: u16) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.pdu.push_u16(address) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn quantity(mut self, quantity: u16) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.pdu.push_u16(quantity) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn byte(mut self, value: u8) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.pdu.push(value) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.pdu.extend(data) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<Pdu> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.pdu),
        }
    }

    /// Build a read-request PDU `[fc][start_hi][start_lo][qty_hi][qty_lo]` for FC01-04.
    pub fn build_read_request(fc: u8, start_address: u16, quantity: u16) -> Result<Pdu> {
        if !matches!(fc, 0x01 | 0x02 | 0x03 | 0x04) {
            return Err(Error::InvalidFc(fc));
        }
        PduBuilder::new()
            .function_code(fc)
            .address(start_address)
            .quantity(quantity)
            .build()
    }
}
