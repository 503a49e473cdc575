//! Fixed configuration written by `Adxl343::begin`.
//!
//! Tap detection is armed at 2 g with a 31.25 ms maximum duration, single tap
//! only, on all three axes. Nothing consumes tap events yet; the interrupt
//! sources stay disabled.

use crate::adxl343::registers::Register;
use crate::transport::Write;

/// Interrupt sources of the INT_ENABLE / INT_MAP / INT_SOURCE registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntConfig {
  pub overrun: bool,
  pub watermark: bool,
  pub freefall: bool,
  pub inactivity: bool,
  pub activity: bool,
  pub double_tap: bool,
  pub single_tap: bool,
  pub data_ready: bool,
}

impl IntConfig {
  pub const NONE: IntConfig = IntConfig {
    overrun: false,
    watermark: false,
    freefall: false,
    inactivity: false,
    activity: false,
    double_tap: false,
    single_tap: false,
    data_ready: false,
  };

  /// Register encoding, bit 0 = overrun through bit 7 = data ready.
  pub const fn bits(&self) -> u8 {
    (self.overrun as u8)
      | (self.watermark as u8) << 1
      | (self.freefall as u8) << 2
      | (self.inactivity as u8) << 3
      | (self.activity as u8) << 4
      | (self.double_tap as u8) << 5
      | (self.single_tap as u8) << 6
      | (self.data_ready as u8) << 7
  }

  pub const fn from_bits(bits: u8) -> Self {
    IntConfig {
      overrun: bits & 0x01 != 0,
      watermark: bits & 0x02 != 0,
      freefall: bits & 0x04 != 0,
      inactivity: bits & 0x08 != 0,
      activity: bits & 0x10 != 0,
      double_tap: bits & 0x20 != 0,
      single_tap: bits & 0x40 != 0,
      data_ready: bits & 0x80 != 0,
    }
  }
}

const TAP_THRESHOLD: u8 = 20;
const TAP_DURATION: u8 = 50;
const TAP_LATENCY: u8 = 0;
const TAP_WINDOW: u8 = 0;
const TAP_AXES_XYZ: u8 = 0x07;
const POWER_CTL_MEASURE: u8 = 0x08;

/// Written in order; `begin` stops at the first write that fails.
pub const INIT_SEQUENCE: [Write; 7] = [
  Write::byte(Register::IntEnable.addr(), IntConfig::NONE.bits()),
  Write::byte(Register::ThreshTap.addr(), TAP_THRESHOLD),
  Write::byte(Register::Dur.addr(), TAP_DURATION),
  Write::byte(Register::Latent.addr(), TAP_LATENCY),
  Write::byte(Register::Window.addr(), TAP_WINDOW),
  Write::byte(Register::TapAxes.addr(), TAP_AXES_XYZ),
  Write::byte(Register::PowerCtl.addr(), POWER_CTL_MEASURE),
];
