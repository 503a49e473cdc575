//! NFC Forum Type 2 Tag layout: the NDEF message sits in an NDEF TLV
//! (`0x03`, length, records) closed by a terminator TLV (`0xFE`).

use core::ops::Range;

use heapless::Vec;
use log::{debug, warn};

use crate::constants::{MAX_MESSAGE_SIZE, SHARED_MEM_SIZE};
use crate::ndef::{
  CreateRecordInfo, NdefError, NdefTag, RecordInfo, RecordType, SharedMemory, TYPE_STRING_MAX,
};

const TLV_NULL: u8 = 0x00;
const TLV_NDEF: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xFE;
const TLV_LONG_LENGTH: u8 = 0xFF;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;
const TNF_WELL_KNOWN: u8 = 0x01;
const TNF_MIME: u8 = 0x02;

const RTD_TEXT: &[u8] = b"T";
const TEXT_LOCALE_MASK: u8 = 0x3F;

// records are built behind a short TLV header
const BODY: usize = 2;
const BODY_CAPACITY: usize = MAX_MESSAGE_SIZE - 3;

#[derive(Debug, Clone, Copy)]
struct OpenRecord {
  start: usize,
  len_at: usize,
  short: bool,
  payload_len: usize,
  end: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Reader {
  cursor: usize,
  end: usize,
}

pub struct Type2Tag<M> {
  memory: M,
  buffer: [u8; SHARED_MEM_SIZE],
  // outgoing
  committed: usize,
  records: usize,
  last_record: usize,
  open: Option<OpenRecord>,
  // incoming
  reader: Reader,
  payload: Range<usize>,
}

impl<M: SharedMemory> Type2Tag<M> {
  pub fn new(memory: M) -> Self {
    Type2Tag {
      memory,
      buffer: [0; SHARED_MEM_SIZE],
      committed: BODY,
      records: 0,
      last_record: BODY,
      open: None,
      reader: Reader::default(),
      payload: 0..0,
    }
  }

  pub fn memory(&self) -> &M {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut M {
    &mut self.memory
  }

  fn append(&mut self, at: usize, bytes: &[u8]) -> Result<usize, NdefError> {
    let end = at + bytes.len();
    if end > BODY + BODY_CAPACITY {
      return Err(NdefError::BufferFull);
    }
    self.buffer[at..end].copy_from_slice(bytes);
    Ok(end)
  }

  /// Locates the NDEF TLV among the `len` bytes loaded into the buffer.
  fn find_message(&self, len: usize) -> Result<Range<usize>, NdefError> {
    let mut i = 0;
    while i < len {
      match self.buffer[i] {
        TLV_NULL => i += 1,
        TLV_TERMINATOR => return Err(NdefError::NoMessage),
        tag => {
          let (value_len, header) = tlv_length(&self.buffer[i + 1..len])?;
          let start = i + 1 + header;
          let end = start + value_len;
          if end > len {
            return Err(NdefError::Malformed);
          }
          if tag == TLV_NDEF {
            return Ok(start..end);
          }
          i = end;
        }
      }
    }
    Err(NdefError::NoMessage)
  }

  fn parse_record(&mut self) -> Result<RecordInfo, NdefError> {
    let body = &self.buffer[..self.reader.end];
    let mut at = self.reader.cursor;

    let flags = *body.get(at).ok_or(NdefError::Malformed)?;
    let type_len = usize::from(*body.get(at + 1).ok_or(NdefError::Malformed)?);
    at += 2;

    let payload_len = if flags & FLAG_SR != 0 {
      let len = usize::from(*body.get(at).ok_or(NdefError::Malformed)?);
      at += 1;
      len
    } else {
      let raw = body.get(at..at + 4).ok_or(NdefError::Malformed)?;
      at += 4;
      u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
    };

    let id_len = if flags & FLAG_IL != 0 {
      let len = usize::from(*body.get(at).ok_or(NdefError::Malformed)?);
      at += 1;
      len
    } else {
      0
    };

    let type_range = at..at + type_len;
    let payload_start = type_range.end + id_len;
    let payload_end = payload_start.checked_add(payload_len).ok_or(NdefError::Malformed)?;
    if payload_end > body.len() {
      return Err(NdefError::Malformed);
    }
    let type_bytes = &body[type_range];

    let record_type = match flags & TNF_MASK {
      TNF_WELL_KNOWN if type_bytes == RTD_TEXT => RecordType::Text,
      TNF_MIME => RecordType::Mime,
      _ => RecordType::Other,
    };

    let mut type_string: Vec<u8, TYPE_STRING_MAX> = Vec::new();
    let mut payload = payload_start..payload_end;
    if record_type == RecordType::Text {
      let status = *body.get(payload_start).ok_or(NdefError::Malformed)?;
      let locale_end = payload_start + 1 + usize::from(status & TEXT_LOCALE_MASK);
      if locale_end > payload_end {
        return Err(NdefError::Malformed);
      }
      let locale = &body[payload_start + 1..locale_end];
      let _ = type_string.extend_from_slice(&locale[..locale.len().min(TYPE_STRING_MAX)]);
      payload = locale_end..payload_end;
    } else {
      let _ = type_string.extend_from_slice(&type_bytes[..type_bytes.len().min(TYPE_STRING_MAX)]);
    }

    self.payload = payload;
    self.reader.cursor = if flags & FLAG_ME != 0 { self.reader.end } else { payload_end };
    Ok(RecordInfo { record_type, type_string })
  }
}

/// Length field of a TLV: one byte, or `0xFF` and a big-endian u16.
fn tlv_length(bytes: &[u8]) -> Result<(usize, usize), NdefError> {
  match bytes {
    [TLV_LONG_LENGTH, hi, lo, ..] => Ok((usize::from(u16::from_be_bytes([*hi, *lo])), 3)),
    [TLV_LONG_LENGTH, ..] | [] => Err(NdefError::Malformed),
    [len, ..] => Ok((usize::from(*len), 1)),
  }
}

impl<M: SharedMemory> NdefTag for Type2Tag<M> {
  fn create_message(&mut self) {
    self.committed = BODY;
    self.records = 0;
    self.last_record = BODY;
    self.open = None;
  }

  fn create_record(&mut self, record_type: RecordType, info: &CreateRecordInfo<'_>) -> Result<(), NdefError> {
    self.open = None;

    let (tnf, type_bytes) = match record_type {
      RecordType::Text => (TNF_WELL_KNOWN, RTD_TEXT),
      RecordType::Mime => (TNF_MIME, info.type_string),
      RecordType::Other => return Err(NdefError::UnsupportedType),
    };
    if type_bytes.len() > usize::from(u8::MAX) {
      return Err(NdefError::UnsupportedType);
    }

    let start = self.committed;
    let flags = if info.short_record { tnf | FLAG_SR } else { tnf };
    let mut at = self.append(start, &[flags, type_bytes.len() as u8])?;
    let len_at = at;
    at = self.append(at, if info.short_record { &[0][..] } else { &[0; 4][..] })?;
    at = self.append(at, type_bytes)?;

    let mut payload_len = 0;
    if record_type == RecordType::Text {
      let locale = info.type_string;
      if locale.len() > usize::from(TEXT_LOCALE_MASK) {
        return Err(NdefError::UnsupportedType);
      }
      at = self.append(at, &[locale.len() as u8])?;
      at = self.append(at, locale)?;
      payload_len = 1 + locale.len();
    }

    self.open = Some(OpenRecord { start, len_at, short: info.short_record, payload_len, end: at });
    Ok(())
  }

  fn write_record_payload(&mut self, payload: &[u8]) -> Result<(), NdefError> {
    let mut open = self.open.ok_or(NdefError::NoOpenRecord)?;
    if open.short && open.payload_len + payload.len() > usize::from(u8::MAX) {
      return Err(NdefError::BufferFull);
    }
    open.end = self.append(open.end, payload)?;
    open.payload_len += payload.len();
    self.open = Some(open);
    Ok(())
  }

  fn commit_record(&mut self) -> Result<(), NdefError> {
    let open = self.open.take().ok_or(NdefError::NoOpenRecord)?;
    if open.short {
      self.buffer[open.len_at] = open.payload_len as u8;
    } else {
      let len = (open.payload_len as u32).to_be_bytes();
      self.buffer[open.len_at..open.len_at + 4].copy_from_slice(&len);
    }
    self.committed = open.end;
    self.last_record = open.start;
    self.records += 1;
    Ok(())
  }

  fn commit_message(&mut self) -> Result<(), NdefError> {
    self.open = None;
    if self.records > 0 {
      self.buffer[BODY] |= FLAG_MB;
      self.buffer[self.last_record] |= FLAG_ME;
    }
    let body_len = self.committed - BODY;
    self.buffer[0] = TLV_NDEF;
    self.buffer[1] = body_len as u8;
    self.buffer[self.committed] = TLV_TERMINATOR;

    let framed = self.committed + 1;
    self.memory.write(0, &self.buffer[..framed])?;
    debug!("ndef: published {} records, {} bytes", self.records, framed);
    Ok(())
  }

  fn get_message(&mut self) -> Result<(), NdefError> {
    self.reader = Reader::default();
    self.payload = 0..0;

    let len = self.memory.capacity().min(SHARED_MEM_SIZE);
    self.memory.read(0, &mut self.buffer[..len])?;
    let body = self.find_message(len)?;
    self.reader = Reader { cursor: body.start, end: body.end };
    // the outgoing message shares the buffer and is gone now
    self.create_message();
    Ok(())
  }

  fn next_record(&mut self) -> Option<RecordInfo> {
    if self.reader.cursor >= self.reader.end {
      return None;
    }
    match self.parse_record() {
      Ok(info) => Some(info),
      Err(e) => {
        warn!("ndef: {}", e);
        self.reader.cursor = self.reader.end;
        self.payload = 0..0;
        None
      }
    }
  }

  fn record_payload(&self) -> &[u8] {
    &self.buffer[self.payload.clone()]
  }
}
