use crate::ndef;

/// Language code used when creating TEXT records.
pub const LOCALE: &[u8] = b"en";
/// Type string used when creating MIME records.
pub const MIME: &[u8] = b"nhs31xx/example.ndef";

/// Largest NDEF message that fits a short TLV in the tag shared memory.
pub const MAX_MESSAGE_SIZE: usize = 254;
pub const SHARED_MEM_SIZE: usize = 256;

// text and mime are always published together, the room left after the framing
// is split evenly between the two records
const DUAL_RECORD_OVERHEAD: usize = ndef::message_overhead(
  true,
  ndef::text_record_overhead(true, LOCALE.len()) + ndef::mime_record_overhead(true, MIME.len()),
);
pub const TEXT_CAPACITY: usize = (MAX_MESSAGE_SIZE - DUAL_RECORD_OVERHEAD) / 2;
pub const MIME_CAPACITY: usize = TEXT_CAPACITY;

pub const DEFAULT_TEXT: &[u8] = b"0 Hello World";
pub const DEFAULT_MIME: &[u8] = &[0, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];

/// 12-bit analog output codes
pub const ANALOG_MIN: u16 = 0;
pub const ANALOG_MAX: u16 = 4095;

pub const POLL_INTERVAL_MS: u32 = 10;
pub const SAMPLE_PERIOD_MS: u32 = 100;
pub const BOOT_DELAY_MS: u32 = 1_000;
