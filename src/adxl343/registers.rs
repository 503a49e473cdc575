/// ADXL343 register map (Analog Devices ADXL343 datasheet, rev. 0, table 19).
///
/// Only the registers the firmware touches are listed. The six data registers
/// are contiguous and auto-increment, so one burst read from `DataX0` returns
/// X, Y and Z as little-endian pairs latched at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
  DevId = 0x00,
  // 62.5 mg/LSB
  ThreshTap = 0x1D,
  // 625 us/LSB
  Dur = 0x21,
  // 1.25 ms/LSB, 0 disables double tap
  Latent = 0x22,
  Window = 0x23,
  TapAxes = 0x2A,
  PowerCtl = 0x2D,
  IntEnable = 0x2E,
  DataX0 = 0x32,
  DataX1 = 0x33,
  DataY0 = 0x34,
  DataY1 = 0x35,
  DataZ0 = 0x36,
  DataZ1 = 0x37,
}

impl Register {
  pub const fn addr(self) -> u8 {
    self as u8
  }
}

/// ALT ADDRESS pin tied low
pub const ADXL343_ADDRESS: u8 = 0x53;
pub const ADXL343_DEVICE_ID: u8 = 0xE5;

/// Bytes in one X/Y/Z burst.
pub const SAMPLE_LEN: usize = 6;
