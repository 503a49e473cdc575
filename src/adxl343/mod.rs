//! ADXL343 3-axis accelerometer over the register transport.

pub mod config;
pub mod registers;

use core::fmt;

use log::{info, warn};

use crate::adxl343::config::INIT_SEQUENCE;
use crate::adxl343::registers::{Register, ADXL343_ADDRESS, ADXL343_DEVICE_ID, SAMPLE_LEN};
use crate::transport::{Read, RegisterTransport};

/// 4 mg per LSB in the default +/-2 g range
const MG_PER_LSB: i32 = 4;

const SAMPLE: Read = Read { reg: Register::DataX0 as u8, len: SAMPLE_LEN as u8 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adxl343Error {
  /// Bus transaction did not complete
  Transport,
  /// DEVID register held something other than 0xE5
  IdMismatch(u8),
  /// A write of the init sequence failed; the remaining writes were skipped
  ConfigWrite(u8),
  /// `read_xyz` before a successful `begin`
  NotReady,
}

impl fmt::Display for Adxl343Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Adxl343Error::Transport => f.write_str("bus transaction failed"),
      Adxl343Error::IdMismatch(id) => write!(f, "unexpected device id {:#04x}", id),
      Adxl343Error::ConfigWrite(reg) => write!(f, "config write to {:#04x} failed", reg),
      Adxl343Error::NotReady => f.write_str("driver not initialized"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelSample {
  pub x: i16,
  pub y: i16,
  pub z: i16,
}

impl AccelSample {
  /// Layout is `[xLo, xHi, yLo, yHi, zLo, zHi]`.
  pub fn decode(raw: &[u8; SAMPLE_LEN]) -> Self {
    AccelSample {
      x: i16::from_le_bytes([raw[0], raw[1]]),
      y: i16::from_le_bytes([raw[2], raw[3]]),
      z: i16::from_le_bytes([raw[4], raw[5]]),
    }
  }

  pub fn milli_g(&self) -> (i32, i32, i32) {
    (
      i32::from(self.x) * MG_PER_LSB,
      i32::from(self.y) * MG_PER_LSB,
      i32::from(self.z) * MG_PER_LSB,
    )
  }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum State {
  Uninitialized,
  Initializing,
  Ready,
  Failed,
}

#[derive(Debug, Clone, Copy)]
enum Event {
  Begin,
  IdMismatch,
  WriteFailed,
  Configured,
}

impl State {
  fn next(self, event: Event) -> State {
    match (self, event) {
      (State::Uninitialized, Event::Begin) => State::Initializing,
      (State::Initializing, Event::Configured) => State::Ready,
      (State::Initializing, Event::IdMismatch) => State::Failed,
      (State::Initializing, Event::WriteFailed) => State::Failed,
      (s, _e) => s,
    }
  }
}

pub struct Adxl343<T> {
  transport: T,
  address: u8,
  state: State,
}

impl<T: RegisterTransport> Adxl343<T> {
  pub fn new(transport: T) -> Self {
    Adxl343::with_address(transport, ADXL343_ADDRESS)
  }

  pub fn with_address(transport: T, address: u8) -> Self {
    Adxl343 {
      transport,
      address,
      state: State::Uninitialized,
    }
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn release(self) -> T {
    self.transport
  }

  /// Contents of DEVID, or 0 when the read fails. 0 is never a valid id.
  pub fn device_id(&mut self) -> u8 {
    let mut id = [0u8; 1];
    match self.transport.read_register(self.address, Register::DevId.addr(), &mut id) {
      Ok(()) => id[0],
      Err(_) => 0,
    }
  }

  /// Verifies the device id and writes the fixed configuration.
  ///
  /// Stops at the first failing write, which can leave the device partly
  /// configured. Only valid once, from `Uninitialized`.
  pub fn begin(&mut self) -> Result<(), Adxl343Error> {
    if self.state != State::Uninitialized {
      return match self.state {
        State::Ready => Ok(()),
        _ => Err(Adxl343Error::NotReady),
      };
    }
    self.state = self.state.next(Event::Begin);

    let id = self.device_id();
    if id != ADXL343_DEVICE_ID {
      warn!("adxl343: no device, id {:#04x}", id);
      self.state = self.state.next(Event::IdMismatch);
      return Err(Adxl343Error::IdMismatch(id));
    }

    for write in INIT_SEQUENCE.iter() {
      if write.send(&mut self.transport, self.address).is_err() {
        warn!("adxl343: write to {:#04x} failed", write.reg);
        self.state = self.state.next(Event::WriteFailed);
        return Err(Adxl343Error::ConfigWrite(write.reg));
      }
    }

    self.state = self.state.next(Event::Configured);
    info!("adxl343: ready");
    Ok(())
  }

  /// One burst read of all six data registers. Reading the axes one by one
  /// could mix samples across the device's latch boundary.
  pub fn read_xyz(&mut self) -> Result<AccelSample, Adxl343Error> {
    if self.state != State::Ready {
      return Err(Adxl343Error::NotReady);
    }

    let mut raw = [0u8; SAMPLE_LEN];
    SAMPLE
      .fetch(&mut self.transport, self.address, &mut raw)
      .map_err(|_| Adxl343Error::Transport)?;
    Ok(AccelSample::decode(&raw))
  }
}
