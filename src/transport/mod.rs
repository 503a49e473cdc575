//! Register oriented access to devices on a 7-bit addressed bus.
//!
//! Every failure the bus can report (busy, NACK, lost arbitration) collapses to
//! a single [`TransportError`]. Nothing here retries; the caller decides.

pub mod i2c;

use core::fmt;

pub const TX_BUFFER_SIZE: usize = 17;

const MAX_ADDRESS: u8 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError;

impl fmt::Display for TransportError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("bus transaction failed")
  }
}

/// One bus transaction: `tx` goes out first, then `rx.len()` bytes come back
/// in the same transaction. An empty `rx` makes it a plain write.
pub trait Transfer {
  fn transfer(&mut self, address: u8, tx: &[u8], rx: &mut [u8]) -> Result<(), TransportError>;
}

pub trait RegisterTransport {
  /// `bytes[0]` is the target register, the rest is written from there on.
  fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError>;

  /// Reads `buf.len()` bytes starting at `register`.
  fn read_register(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: Transfer> RegisterTransport for T {
  fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), TransportError> {
    self.transfer(address, bytes, &mut [])
  }

  fn read_register(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), TransportError> {
    self.transfer(address, &[register], buf)
  }
}

/// Every transaction starts with a register address, and the device address
/// must fit in 7 bits.
pub(crate) fn check_shape(address: u8, tx: &[u8]) -> Result<(), TransportError> {
  if address > MAX_ADDRESS || tx.is_empty() {
    return Err(TransportError);
  }
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Read {
  pub reg: u8,
  pub len: u8,
}

/// A register write: the register address followed by up to
/// `TX_BUFFER_SIZE - 1` data bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Write {
  pub reg: u8,
  pub len: u8,
  pub data: [u8; TX_BUFFER_SIZE],
}

impl Write {
  pub const fn byte(reg: u8, value: u8) -> Self {
    let mut data = [0; TX_BUFFER_SIZE];
    data[0] = reg;
    data[1] = value;
    Write { reg, len: 1, data }
  }

  /// `None` when `values` does not fit behind the register byte.
  pub fn block(reg: u8, values: &[u8]) -> Option<Self> {
    if values.len() >= TX_BUFFER_SIZE {
      return None;
    }
    let mut data = [0; TX_BUFFER_SIZE];
    data[0] = reg;
    data[1..=values.len()].copy_from_slice(values);
    Some(Write { reg, len: values.len() as u8, data })
  }

  /// Register byte plus payload, ready for the bus.
  pub fn as_bytes(&self) -> &[u8] {
    &self.data[..usize::from(self.len) + 1]
  }

  pub fn send<T: RegisterTransport>(&self, transport: &mut T, address: u8) -> Result<(), TransportError> {
    transport.write(address, self.as_bytes())
  }
}

impl Read {
  pub fn fetch<T: RegisterTransport>(&self, transport: &mut T, address: u8, buf: &mut [u8]) -> Result<(), TransportError> {
    let len = usize::from(self.len);
    if buf.len() < len {
      return Err(TransportError);
    }
    transport.read_register(address, self.reg, &mut buf[..len])
  }
}
