//! NFC tag bridge for the stm32f4 discovery board.
//!
//! Hardware independent pieces live here so they can be exercised on the
//! host; `main.rs` wires them to the board.

#![cfg_attr(not(test), no_std)]

pub mod adxl343;
pub mod analog;
pub mod constants;
pub mod ndef;
pub mod payload;
pub mod sampler;
pub mod session;
pub mod transport;

#[cfg(test)]
mod fakes;
