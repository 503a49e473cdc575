//! Host-side stand-ins for the hardware seams, used by the unit tests.

use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c;

use crate::analog::{AnalogOutput, Level};

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
  Write(u8, Vec<u8>),
  WriteRead(u8, Vec<u8>, usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusFault;

/// Records every transaction and answers reads from a queue of canned
/// responses (zeros once the queue runs dry).
#[derive(Debug, Default)]
pub struct FakeBus {
  pub ops: Vec<Op>,
  responses: VecDeque<Vec<u8>>,
  fail_after: Option<usize>,
}

impl FakeBus {
  pub fn new() -> Self {
    FakeBus::default()
  }

  pub fn respond(&mut self, bytes: &[u8]) {
    self.responses.push_back(bytes.to_vec());
  }

  /// Lets `n` transactions through, then fails every following one.
  pub fn fail_after(&mut self, n: usize) {
    self.fail_after = Some(n);
  }

  pub fn writes(&self) -> Vec<Vec<u8>> {
    self
      .ops
      .iter()
      .filter_map(|op| match op {
        Op::Write(_, bytes) => Some(bytes.clone()),
        _ => None,
      })
      .collect()
  }

  fn faulted(&self) -> bool {
    match self.fail_after {
      Some(n) => self.ops.len() >= n,
      None => false,
    }
  }
}

impl i2c::Write for FakeBus {
  type Error = BusFault;

  fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusFault> {
    if self.faulted() {
      return Err(BusFault);
    }
    self.ops.push(Op::Write(address, bytes.to_vec()));
    Ok(())
  }
}

impl i2c::WriteRead for FakeBus {
  type Error = BusFault;

  fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusFault> {
    if self.faulted() {
      return Err(BusFault);
    }
    self.ops.push(Op::WriteRead(address, bytes.to_vec(), buffer.len()));
    let response = self.responses.pop_front().unwrap_or_default();
    for (dst, src) in buffer.iter_mut().zip(response.iter().chain(core::iter::repeat(&0))) {
      *dst = *src;
    }
    Ok(())
  }
}

#[derive(Debug, Default)]
pub struct FakeDelay {
  pub total_ms: u32,
  pub calls: usize,
}

impl DelayMs<u32> for FakeDelay {
  fn delay_ms(&mut self, ms: u32) {
    self.total_ms += ms;
    self.calls += 1;
  }
}

#[derive(Debug, Default)]
pub struct FakeOutput {
  pub level: Option<Level>,
  pub writes: usize,
}

impl AnalogOutput for FakeOutput {
  fn set_level(&mut self, level: Level) {
    self.level = Some(level);
    self.writes += 1;
  }
}
