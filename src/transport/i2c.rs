use embedded_hal::blocking::i2c;

use crate::transport::{check_shape, Transfer, TransportError};

/// Any blocking HAL I2C master is a transport. The HAL owns the master state
/// machine and the transaction timeout; its error detail is dropped here.
impl<I> Transfer for I
where
  I: i2c::Write + i2c::WriteRead,
{
  fn transfer(&mut self, address: u8, tx: &[u8], rx: &mut [u8]) -> Result<(), TransportError> {
    check_shape(address, tx)?;

    if rx.is_empty() {
      i2c::Write::write(self, address, tx).map_err(|_| TransportError)
    } else {
      i2c::WriteRead::write_read(self, address, tx, rx).map_err(|_| TransportError)
    }
  }
}
