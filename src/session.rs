//! NFC field and message lifecycle.
//!
//! Interrupt handlers only raise flags in [`SessionFlags`]. The polling loop in
//! [`Session`] is the single consumer: it publishes a fresh message once per
//! field arrival and decodes what the reader wrote when a message becomes
//! available. Only the loop touches the tag memory and the payloads.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, warn};

use crate::analog::{AnalogOutput, Level};
use crate::constants::{LOCALE, MIME, POLL_INTERVAL_MS};
use crate::ndef::{CreateRecordInfo, NdefError, NdefTag, RecordType};
use crate::payload::PayloadStore;

/// Written by the handlers, read and cleared by the loop. Each flag has one
/// writer per side, so plain atomics are enough.
pub struct SessionFlags {
  field_present: AtomicBool,
  message_available: AtomicBool,
  button_pressed: AtomicBool,
}

impl SessionFlags {
  pub const fn new() -> Self {
    SessionFlags {
      field_present: AtomicBool::new(false),
      message_available: AtomicBool::new(false),
      button_pressed: AtomicBool::new(false),
    }
  }

  /// Starts as if a field were present so the boot payload gets published on
  /// the first iteration.
  pub const fn at_boot() -> Self {
    SessionFlags {
      field_present: AtomicBool::new(true),
      message_available: AtomicBool::new(false),
      button_pressed: AtomicBool::new(false),
    }
  }

  pub fn on_field_status(&self, present: bool) {
    self.field_present.store(present, Ordering::Release);
  }

  pub fn on_message_available(&self) {
    self.message_available.store(true, Ordering::Release);
  }

  pub fn on_button(&self) {
    self.button_pressed.store(true, Ordering::Release);
  }

  pub fn field_present(&self) -> bool {
    self.field_present.load(Ordering::Acquire)
  }

  /// Clears the flag and reports whether it was set. Called before acting, so
  /// an event raised while handling the previous one stays pending.
  pub fn take_message_available(&self) -> bool {
    self.message_available.swap(false, Ordering::AcqRel)
  }

  pub fn take_button_pressed(&self) -> bool {
    self.button_pressed.swap(false, Ordering::AcqRel)
  }
}

impl Default for SessionFlags {
  fn default() -> Self {
    SessionFlags::new()
  }
}

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
  pub generated: bool,
  pub parsed: bool,
  pub advanced: bool,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum State {
  NoField,
  Field,
}

#[derive(Debug, Clone, Copy)]
enum Action {
  DoNothing,
  Generate,
}

impl State {
  fn next(self, field_present: bool) -> (State, Action) {
    match (self, field_present) {
      (State::NoField, true) => (State::Field, Action::Generate),
      (State::Field, false) => (State::NoField, Action::DoNothing),
      (s, _) => (s, Action::DoNothing),
    }
  }
}

const TEXT_RECORD: CreateRecordInfo<'static> = CreateRecordInfo { type_string: LOCALE, short_record: true };
const MIME_RECORD: CreateRecordInfo<'static> = CreateRecordInfo { type_string: MIME, short_record: true };

pub struct Session<T, A> {
  tag: T,
  output: A,
  payload: PayloadStore,
  state: State,
}

impl<T: NdefTag, A: AnalogOutput> Session<T, A> {
  pub fn new(tag: T, output: A) -> Self {
    Session::with_payload(tag, output, PayloadStore::new())
  }

  pub fn with_payload(tag: T, output: A, payload: PayloadStore) -> Self {
    Session {
      tag,
      output,
      payload,
      state: State::NoField,
    }
  }

  pub fn payload(&self) -> &PayloadStore {
    &self.payload
  }

  pub fn tag(&self) -> &T {
    &self.tag
  }

  pub fn tag_mut(&mut self) -> &mut T {
    &mut self.tag
  }

  pub fn output(&self) -> &A {
    &self.output
  }

  /// One pass of the loop.
  pub fn poll(&mut self, flags: &SessionFlags) -> Activity {
    let mut activity = Activity::default();

    let action;
    (self.state, action) = self.state.next(flags.field_present());

    if let Action::Generate = action {
      info!("session: field detected");
      if let Err(e) = self.generate() {
        warn!("session: message not published: {}", e);
      }
      activity.generated = true;
    }

    if self.state == State::Field && flags.take_message_available() {
      self.parse();
      activity.parsed = true;
    }

    if flags.take_button_pressed() {
      self.payload.advance();
      activity.advanced = true;
    }

    activity
  }

  pub fn step<D: DelayMs<u32>>(&mut self, flags: &SessionFlags, delay: &mut D) -> Activity {
    let activity = self.poll(flags);
    delay.delay_ms(POLL_INTERVAL_MS);
    activity
  }

  pub fn run<D: DelayMs<u32>>(&mut self, flags: &SessionFlags, delay: &mut D) -> ! {
    loop {
      self.step(flags, delay);
    }
  }

  /// Publishes the text and the binary payload as a TEXT and a MIME record.
  /// A record that cannot be written is left out; the other still goes.
  fn generate(&mut self) -> Result<(), NdefError> {
    self.tag.create_message();

    if let Err(e) = append_record(&mut self.tag, RecordType::Text, &TEXT_RECORD, self.payload.text.text()) {
      warn!("session: text record dropped: {}", e);
    }
    if let Err(e) = append_record(&mut self.tag, RecordType::Mime, &MIME_RECORD, self.payload.mime.as_bytes()) {
      warn!("session: mime record dropped: {}", e);
    }

    self.tag.commit_message()
  }

  fn parse(&mut self) {
    if let Err(e) = self.decode() {
      warn!("session: {}", e);
    }

    if let Some(level) = self.payload.text.first().and_then(Level::from_command) {
      debug!("session: analog output {:?}", level);
      self.output.set_level(level);
    }
  }

  fn decode(&mut self) -> Result<(), NdefError> {
    self.tag.get_message()?;

    while let Some(info) = self.tag.next_record() {
      let result = match info.record_type {
        RecordType::Text => self.payload.text.overwrite(self.tag.record_payload()),
        RecordType::Mime => self.payload.mime.overwrite(self.tag.record_payload()),
        RecordType::Other => Ok(()),
      };
      if let Err(e) = result {
        warn!("session: {:?} record dropped: {}", info.record_type, e);
      }
    }
    Ok(())
  }
}

fn append_record<T: NdefTag>(
  tag: &mut T,
  record_type: RecordType,
  info: &CreateRecordInfo<'_>,
  payload: &[u8],
) -> Result<(), NdefError> {
  tag.create_record(record_type, info)?;
  tag.write_record_payload(payload)?;
  tag.commit_record()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::{DEFAULT_MIME, MIME_CAPACITY, TEXT_CAPACITY};
  use crate::fakes::{FakeDelay, FakeOutput};
  use crate::ndef::t2t::Type2Tag;
  use crate::ndef::RecordInfo;

  /// Real codec underneath; counts publications and can raise a new
  /// message-available event from inside a decode.
  struct RecordingTag<'a> {
    inner: Type2Tag<[u8; 256]>,
    published: usize,
    reads: usize,
    fail_text_payload: bool,
    raise_during_read: Option<&'a SessionFlags>,
  }

  impl<'a> RecordingTag<'a> {
    fn new() -> Self {
      RecordingTag {
        inner: Type2Tag::new([0u8; 256]),
        published: 0,
        reads: 0,
        fail_text_payload: false,
        raise_during_read: None,
      }
    }

    /// Puts a message into shared memory the way a reader would.
    fn reader_writes(&mut self, records: &[(RecordType, &[u8])]) {
      let mut scratch = Type2Tag::new([0u8; 256]);
      scratch.create_message();
      for (record_type, payload) in records {
        let info = match record_type {
          RecordType::Text => TEXT_RECORD,
          _ => MIME_RECORD,
        };
        scratch.create_record(*record_type, &info).unwrap();
        scratch.write_record_payload(payload).unwrap();
        scratch.commit_record().unwrap();
      }
      scratch.commit_message().unwrap();
      *self.inner.memory_mut() = *scratch.memory();
    }

    fn reader_writes_text(&mut self, text: &[u8]) {
      self.reader_writes(&[(RecordType::Text, text)]);
    }

    fn reader_writes_both(&mut self, text: &[u8], mime: &[u8]) {
      self.reader_writes(&[(RecordType::Text, text), (RecordType::Mime, mime)]);
    }

    fn raw(&mut self, bytes: &[u8]) {
      let mem = self.inner.memory_mut();
      *mem = [0u8; 256];
      mem[..bytes.len()].copy_from_slice(bytes);
    }
  }

  impl<'a> NdefTag for RecordingTag<'a> {
    fn create_message(&mut self) {
      self.inner.create_message()
    }

    fn create_record(&mut self, record_type: RecordType, info: &CreateRecordInfo<'_>) -> Result<(), NdefError> {
      self.inner.create_record(record_type, info)
    }

    fn write_record_payload(&mut self, payload: &[u8]) -> Result<(), NdefError> {
      if self.fail_text_payload && payload.starts_with(b"0 ") {
        return Err(NdefError::BufferFull);
      }
      self.inner.write_record_payload(payload)
    }

    fn commit_record(&mut self) -> Result<(), NdefError> {
      self.inner.commit_record()
    }

    fn commit_message(&mut self) -> Result<(), NdefError> {
      self.published += 1;
      self.inner.commit_message()
    }

    fn get_message(&mut self) -> Result<(), NdefError> {
      self.reads += 1;
      if let Some(flags) = self.raise_during_read {
        flags.on_message_available();
      }
      self.inner.get_message()
    }

    fn next_record(&mut self) -> Option<RecordInfo> {
      self.inner.next_record()
    }

    fn record_payload(&self) -> &[u8] {
      self.inner.record_payload()
    }
  }

  fn session<'a>() -> Session<RecordingTag<'a>, FakeOutput> {
    Session::new(RecordingTag::new(), FakeOutput::default())
  }

  #[test]
  fn field_arrival_publishes_once() {
    let flags = SessionFlags::new();
    let mut s = session();

    assert_eq!(s.poll(&flags), Activity::default());
    flags.on_field_status(true);
    assert!(s.poll(&flags).generated);
    for _ in 0..5 {
      assert!(!s.poll(&flags).generated);
    }
    assert_eq!(s.tag().published, 1);
  }

  #[test]
  fn every_new_arrival_publishes_again() {
    let flags = SessionFlags::new();
    let mut s = session();

    flags.on_field_status(true);
    s.poll(&flags);
    flags.on_field_status(false);
    assert!(!s.poll(&flags).generated);
    flags.on_field_status(true);
    assert!(s.poll(&flags).generated);
    assert_eq!(s.tag().published, 2);
  }

  #[test]
  fn boot_flags_publish_on_first_poll() {
    let flags = SessionFlags::at_boot();
    let mut s = session();

    assert!(s.poll(&flags).generated);
  }

  #[test]
  fn published_message_carries_both_payloads() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    let tag = s.tag_mut();
    tag.inner.get_message().unwrap();
    assert_eq!(tag.inner.next_record().unwrap().record_type, RecordType::Text);
    assert_eq!(tag.inner.record_payload(), b"0 Hello World");
    assert_eq!(tag.inner.next_record().unwrap().record_type, RecordType::Mime);
    assert_eq!(tag.inner.record_payload().len(), MIME_CAPACITY);
    assert_eq!(&tag.inner.record_payload()[..DEFAULT_MIME.len()], DEFAULT_MIME);
  }

  #[test]
  fn failed_text_record_still_publishes_mime() {
    let flags = SessionFlags::at_boot();
    let mut tag = RecordingTag::new();
    tag.fail_text_payload = true;
    let mut s = Session::new(tag, FakeOutput::default());
    s.poll(&flags);

    let tag = s.tag_mut();
    assert_eq!(tag.published, 1);
    tag.inner.get_message().unwrap();
    assert_eq!(tag.inner.next_record().unwrap().record_type, RecordType::Mime);
    assert!(tag.inner.next_record().is_none());
  }

  #[test]
  fn message_without_field_waits() {
    let flags = SessionFlags::new();
    let mut s = session();

    flags.on_message_available();
    assert!(!s.poll(&flags).parsed);
    flags.on_field_status(true);
    assert!(s.poll(&flags).parsed);
  }

  #[test]
  fn received_text_drives_output_low() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    s.tag_mut().reader_writes_text(b"0 Hello World");
    flags.on_message_available();
    assert!(s.poll(&flags).parsed);
    assert_eq!(s.output().level, Some(Level::Min));
  }

  #[test]
  fn leading_one_drives_output_high() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    s.tag_mut().reader_writes_both(b"1 on", &[9, 8, 7]);
    flags.on_message_available();
    s.poll(&flags);

    assert_eq!(s.output().level, Some(Level::Max));
    assert_eq!(s.payload().text.text(), b"1 on");
    assert_eq!(&s.payload().mime.as_bytes()[..4], &[9, 8, 7, 0]);
  }

  #[test]
  fn other_leading_character_leaves_output_alone() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    s.tag_mut().reader_writes_text(b"1");
    flags.on_message_available();
    s.poll(&flags);
    s.tag_mut().reader_writes_text(b"5 volts");
    flags.on_message_available();
    s.poll(&flags);

    assert_eq!(s.payload().text.text(), b"5 volts");
    assert_eq!(s.output().level, Some(Level::Max));
    assert_eq!(s.output().writes, 1);
  }

  #[test]
  fn oversized_record_keeps_previous_payload() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    let big = [b'1'; TEXT_CAPACITY + 1];
    s.tag_mut().reader_writes_both(&big, &[1, 2]);
    flags.on_message_available();
    s.poll(&flags);

    assert_eq!(s.payload().text.text(), b"0 Hello World");
    assert_eq!(&s.payload().mime.as_bytes()[..3], &[1, 2, 0]);
    // the untouched text still starts with '0'
    assert_eq!(s.output().level, Some(Level::Min));
  }

  #[test]
  fn text_one_short_of_capacity_stays_terminated() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    let text = [b'0'; TEXT_CAPACITY - 1];
    s.tag_mut().reader_writes_text(&text);
    flags.on_message_available();
    s.poll(&flags);

    assert_eq!(s.payload().text.text(), &text[..]);
    assert_eq!(s.payload().text.as_bytes()[TEXT_CAPACITY - 1], 0);
  }

  #[test]
  fn unknown_records_are_skipped() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    s.tag_mut().raw(&[
      0x03, 0x0E, //
      0x91, 0x01, 0x03, b'U', 0x04, b'a', b'b', //
      0x51, 0x01, 0x03, b'T', 0x02, b'e', b'n', //
      0xFE,
    ]);
    flags.on_message_available();
    s.poll(&flags);

    assert!(s.payload().text.text().is_empty());
    assert_eq!(s.output().level, None);
  }

  #[test]
  fn event_raised_during_decode_is_kept() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);
    s.tag_mut().raise_during_read = Some(&flags);

    flags.on_message_available();
    assert!(s.poll(&flags).parsed);
    s.tag_mut().raise_during_read = None;
    assert!(s.poll(&flags).parsed);
    assert!(!s.poll(&flags).parsed);
    assert_eq!(s.tag().reads, 2);
  }

  #[test]
  fn missing_message_still_evaluates_output() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    s.tag_mut().raw(&[0xFE]);
    flags.on_message_available();
    assert!(s.poll(&flags).parsed);
    assert_eq!(s.output().level, Some(Level::Min));
  }

  #[test]
  fn button_advances_next_publication() {
    let flags = SessionFlags::at_boot();
    let mut s = session();
    s.poll(&flags);

    flags.on_button();
    assert!(s.poll(&flags).advanced);
    assert_eq!(s.payload().text.text(), b"1 Hello World");
    assert_eq!(s.tag().published, 1);

    flags.on_field_status(false);
    s.poll(&flags);
    flags.on_field_status(true);
    s.poll(&flags);
    let tag = s.tag_mut();
    tag.inner.get_message().unwrap();
    tag.inner.next_record().unwrap();
    assert_eq!(tag.inner.record_payload(), b"1 Hello World");
  }

  #[test]
  fn step_sleeps_between_polls() {
    let flags = SessionFlags::new();
    let mut s = session();
    let mut delay = FakeDelay::default();

    for _ in 0..3 {
      s.step(&flags, &mut delay);
    }
    assert_eq!(delay.calls, 3);
    assert_eq!(delay.total_ms, 3 * POLL_INTERVAL_MS);
  }
}
