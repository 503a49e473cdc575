use embedded_hal::PwmPin;

use crate::constants::{ANALOG_MAX, ANALOG_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Min,
  Max,
}

impl Level {
  /// 12-bit output code
  pub const fn code(self) -> u16 {
    match self {
      Level::Min => ANALOG_MIN,
      Level::Max => ANALOG_MAX,
    }
  }

  /// '0' switches the output off, '1' drives it fully; anything else is not a command.
  pub fn from_command(first: u8) -> Option<Level> {
    match first {
      b'0' => Some(Level::Min),
      b'1' => Some(Level::Max),
      _ => None,
    }
  }
}

/// Fire and forget: there is no error path.
pub trait AnalogOutput {
  fn set_level(&mut self, level: Level);
}

/// Analog level rendered as PWM duty on a timer channel.
pub struct PwmOutput<P> {
  pin: P,
}

impl<P: PwmPin<Duty = u16>> PwmOutput<P> {
  pub fn new(mut pin: P) -> Self {
    pin.set_duty(0);
    pin.enable();
    PwmOutput { pin }
  }

  pub fn duty(&self) -> u16 {
    self.pin.get_duty()
  }
}

impl<P: PwmPin<Duty = u16>> AnalogOutput for PwmOutput<P> {
  fn set_level(&mut self, level: Level) {
    let max_duty = u32::from(self.pin.get_max_duty());
    let duty = u32::from(level.code()) * max_duty / u32::from(ANALOG_MAX);

    self.pin.disable();
    self.pin.set_duty(duty as u16);
    self.pin.enable();
  }
}
