//! Periodic accelerometer readout.

use core::fmt::Write as _;

use embedded_hal::blocking::delay::DelayMs;
use heapless::String;
use log::debug;

use crate::adxl343::{AccelSample, Adxl343, Adxl343Error};
use crate::constants::SAMPLE_PERIOD_MS;
use crate::transport::RegisterTransport;

/// Room for `X: -32768 Y: -32768 Z: -32768`.
pub const LINE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
  Sample(AccelSample),
  BadData,
}

pub fn format_reading(reading: &Reading) -> String<LINE_LEN> {
  let mut line = String::new();
  // cannot overflow, LINE_LEN covers the widest sample
  let _ = match reading {
    Reading::Sample(s) => write!(line, "X: {} Y: {} Z: {}", s.x, s.y, s.z),
    Reading::BadData => line.write_str("bad data"),
  };
  line
}

pub struct Sampler<T> {
  accel: Adxl343<T>,
}

impl<T: RegisterTransport> Sampler<T> {
  /// Sampling only starts on a configured device.
  pub fn start(mut accel: Adxl343<T>) -> Result<Self, Adxl343Error> {
    accel.begin()?;
    Ok(Sampler { accel })
  }

  pub fn tick(&mut self) -> Reading {
    let reading = match self.accel.read_xyz() {
      Ok(sample) => Reading::Sample(sample),
      Err(_) => Reading::BadData,
    };
    debug!("{}", format_reading(&reading));
    reading
  }

  pub fn run<D: DelayMs<u32>>(&mut self, delay: &mut D) -> ! {
    loop {
      self.tick();
      delay.delay_ms(SAMPLE_PERIOD_MS);
    }
  }

  pub fn release(self) -> Adxl343<T> {
    self.accel
  }
}
