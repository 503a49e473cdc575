//! Text and binary payloads exchanged with the NFC reader.

use core::fmt;

use crate::constants::{DEFAULT_MIME, DEFAULT_TEXT, MIME_CAPACITY, TEXT_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
  RecordTooLarge { len: usize, capacity: usize },
}

impl fmt::Display for PayloadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PayloadError::RecordTooLarge { len, capacity } => {
        write!(f, "record of {} bytes exceeds {} byte buffer", len, capacity)
      }
    }
  }
}

/// Fixed capacity buffer, zero padded behind its content.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload<const N: usize> {
  bytes: [u8; N],
}

impl<const N: usize> Payload<N> {
  /// `init` is cut at `N` bytes.
  pub const fn with_default(init: &[u8]) -> Self {
    let mut bytes = [0u8; N];
    let mut i = 0;
    while i < init.len() && i < N {
      bytes[i] = init[i];
      i += 1;
    }
    Payload { bytes }
  }

  pub const fn capacity(&self) -> usize {
    N
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Content up to the first NUL.
  pub fn text(&self) -> &[u8] {
    let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(N);
    &self.bytes[..end]
  }

  pub fn first(&self) -> Option<u8> {
    self.bytes.first().copied()
  }

  /// Replaces the whole buffer with `data` and zero fills the rest. Data that
  /// does not fit leaves the buffer untouched.
  pub fn overwrite(&mut self, data: &[u8]) -> Result<(), PayloadError> {
    if data.len() > N {
      return Err(PayloadError::RecordTooLarge { len: data.len(), capacity: N });
    }
    self.bytes[..data.len()].copy_from_slice(data);
    for b in self.bytes[data.len()..].iter_mut() {
      *b = 0;
    }
    Ok(())
  }

  pub(crate) fn bytes_mut(&mut self) -> &mut [u8; N] {
    &mut self.bytes
  }
}

impl<const N: usize> fmt::Debug for Payload<N> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Payload").field("content", &self.text()).field("capacity", &N).finish()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadStore {
  pub text: Payload<TEXT_CAPACITY>,
  pub mime: Payload<MIME_CAPACITY>,
}

impl PayloadStore {
  pub const fn new() -> Self {
    PayloadStore {
      text: Payload::with_default(DEFAULT_TEXT),
      mime: Payload::with_default(DEFAULT_MIME),
    }
  }

  /// Moves the payload on for the next published message: the leading digit
  /// of the text counts up and wraps at '9', the first binary byte increments.
  pub fn advance(&mut self) {
    let text = self.text.bytes_mut();
    text[0] = match text[0] {
      b'9' => b'0',
      d @ b'0'..=b'8' => d + 1,
      other => other,
    };
    let mime = self.mime.bytes_mut();
    mime[0] = mime[0].wrapping_add(1);
  }
}

impl Default for PayloadStore {
  fn default() -> Self {
    PayloadStore::new()
  }
}
