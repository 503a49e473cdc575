//! Tag shared memory of an NTAG I2C bridge, reached over the register transport.
//!
//! The I2C side addresses memory in 16 byte blocks: write the block number,
//! then read or write all 16 bytes. Block 0 holds the serial number and the
//! capability container; the NDEF area starts at block 1.

use crate::ndef::{MemoryError, SharedMemory};
use crate::transport::{RegisterTransport, Write};

pub const NTAG_ADDRESS: u8 = 0x55;
pub const BLOCK_SIZE: usize = 16;

const FIRST_USER_BLOCK: usize = 0x01;
const USER_BLOCKS: usize = 0x37;

pub struct NtagMemory<T> {
  transport: T,
  address: u8,
}

impl<T: RegisterTransport> NtagMemory<T> {
  pub fn new(transport: T) -> Self {
    NtagMemory { transport, address: NTAG_ADDRESS }
  }

  pub fn release(self) -> T {
    self.transport
  }

  fn read_block(&mut self, block: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), MemoryError> {
    self
      .transport
      .read_register(self.address, (FIRST_USER_BLOCK + block) as u8, buf)
      .map_err(|_| MemoryError::Transport)
  }

  fn write_block(&mut self, block: usize, data: &[u8; BLOCK_SIZE]) -> Result<(), MemoryError> {
    let write = Write::block((FIRST_USER_BLOCK + block) as u8, data).ok_or(MemoryError::OutOfRange)?;
    write.send(&mut self.transport, self.address).map_err(|_| MemoryError::Transport)
  }

  fn check(&self, offset: usize, len: usize) -> Result<(), MemoryError> {
    match offset.checked_add(len) {
      Some(end) if end <= self.capacity() => Ok(()),
      _ => Err(MemoryError::OutOfRange),
    }
  }
}

impl<T: RegisterTransport> SharedMemory for NtagMemory<T> {
  fn capacity(&self) -> usize {
    USER_BLOCKS * BLOCK_SIZE
  }

  fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
    self.check(offset, buf.len())?;

    let mut done = 0;
    while done < buf.len() {
      let pos = offset + done;
      let (block, within) = (pos / BLOCK_SIZE, pos % BLOCK_SIZE);
      let n = (BLOCK_SIZE - within).min(buf.len() - done);

      let mut raw = [0u8; BLOCK_SIZE];
      self.read_block(block, &mut raw)?;
      buf[done..done + n].copy_from_slice(&raw[within..within + n]);
      done += n;
    }
    Ok(())
  }

  fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
    self.check(offset, data.len())?;

    let mut done = 0;
    while done < data.len() {
      let pos = offset + done;
      let (block, within) = (pos / BLOCK_SIZE, pos % BLOCK_SIZE);
      let n = (BLOCK_SIZE - within).min(data.len() - done);

      let mut raw = [0u8; BLOCK_SIZE];
      // partial blocks keep the bytes around the written range
      if n < BLOCK_SIZE {
        self.read_block(block, &mut raw)?;
      }
      raw[within..within + n].copy_from_slice(&data[done..done + n]);
      self.write_block(block, &raw)?;
      done += n;
    }
    Ok(())
  }
}
