//! NDEF message boundary between the session and the tag shared memory.
//!
//! [`NdefTag`] is the contract the session drives: build a message record by
//! record on one side, walk the records of a received message on the other.
//! [`t2t::Type2Tag`] implements it over any [`SharedMemory`].

pub mod ntag;
pub mod t2t;

use core::fmt;

use heapless::Vec;

/// Longest locale or MIME type string kept in a [`RecordInfo`].
pub const TYPE_STRING_MAX: usize = 32;

/// Flags byte, type length and the 1 or 4 byte payload length.
pub const fn record_header_overhead(short_record: bool) -> usize {
  2 + if short_record { 1 } else { 4 }
}

/// Header, the `T` type and the status byte in front of the locale.
pub const fn text_record_overhead(short_record: bool, locale_len: usize) -> usize {
  record_header_overhead(short_record) + 1 + 1 + locale_len
}

pub const fn mime_record_overhead(short_record: bool, mime_len: usize) -> usize {
  record_header_overhead(short_record) + mime_len
}

/// NDEF TLV header (1 or 3 byte length) and the terminator TLV around the records.
pub const fn message_overhead(short_message: bool, records_overhead: usize) -> usize {
  records_overhead + if short_message { 2 } else { 4 } + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
  Text,
  Mime,
  Other,
}

/// Parameters of a record to create: the locale for TEXT, the media type for MIME.
#[derive(Debug, Clone, Copy)]
pub struct CreateRecordInfo<'a> {
  pub type_string: &'a [u8],
  pub short_record: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordInfo {
  pub record_type: RecordType,
  /// Locale for TEXT, media type for MIME, raw type otherwise.
  pub type_string: Vec<u8, TYPE_STRING_MAX>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
  OutOfRange,
  Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdefError {
  /// Not enough room left in the message buffer
  BufferFull,
  /// Payload write or commit without a created record
  NoOpenRecord,
  /// Only TEXT and MIME records are created
  UnsupportedType,
  /// No NDEF TLV in the shared memory
  NoMessage,
  Malformed,
  Memory(MemoryError),
}

impl From<MemoryError> for NdefError {
  fn from(e: MemoryError) -> Self {
    NdefError::Memory(e)
  }
}

impl fmt::Display for NdefError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NdefError::BufferFull => f.write_str("message buffer full"),
      NdefError::NoOpenRecord => f.write_str("no record in progress"),
      NdefError::UnsupportedType => f.write_str("unsupported record type"),
      NdefError::NoMessage => f.write_str("no ndef message"),
      NdefError::Malformed => f.write_str("malformed ndef data"),
      NdefError::Memory(MemoryError::OutOfRange) => f.write_str("shared memory access out of range"),
      NdefError::Memory(MemoryError::Transport) => f.write_str("shared memory bus failure"),
    }
  }
}

/// Memory the NFC reader and the firmware both see.
pub trait SharedMemory {
  fn capacity(&self) -> usize;
  fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError>;
  fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError>;
}

impl<const N: usize> SharedMemory for [u8; N] {
  fn capacity(&self) -> usize {
    N
  }

  fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
    let src = self.get(offset..offset + buf.len()).ok_or(MemoryError::OutOfRange)?;
    buf.copy_from_slice(src);
    Ok(())
  }

  fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
    let dst = self.get_mut(offset..offset + data.len()).ok_or(MemoryError::OutOfRange)?;
    dst.copy_from_slice(data);
    Ok(())
  }
}

pub trait NdefTag {
  /// Starts an empty outgoing message, dropping anything not yet committed.
  fn create_message(&mut self);

  /// Writes a record header. A previous record that was never committed is discarded.
  fn create_record(&mut self, record_type: RecordType, info: &CreateRecordInfo<'_>) -> Result<(), NdefError>;

  /// Appends to the payload of the record being built. May be called repeatedly.
  fn write_record_payload(&mut self, payload: &[u8]) -> Result<(), NdefError>;

  /// Adds the record being built to the message.
  fn commit_record(&mut self) -> Result<(), NdefError>;

  /// Publishes the committed records to the shared memory.
  fn commit_message(&mut self) -> Result<(), NdefError>;

  /// Loads the message currently in the shared memory for reading.
  fn get_message(&mut self) -> Result<(), NdefError>;

  /// Advances to the next record of the loaded message.
  fn next_record(&mut self) -> Option<RecordInfo>;

  /// Payload of the record `next_record` last returned. For TEXT records only
  /// the text, without status byte and locale.
  fn record_payload(&self) -> &[u8];
}
