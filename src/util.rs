use cortex_m_semihosting::hprintln;
use log::{LevelFilter, Log, Metadata, Record};

pub mod debugger {
  use core::sync::atomic::{AtomicBool, Ordering};

  /// Debug Halting Control and Status Register
  const DHCSR: usize = 0xE000_EDF0;
  const C_DEBUGEN: u32 = 1;

  static ENABLED: AtomicBool = AtomicBool::new(false);

  /// Semihosting calls hard fault without a debugger, so output is only
  /// enabled when one is attached at boot.
  pub fn init() -> bool {
    let r = DHCSR as *const u32;
    let attached = unsafe { core::ptr::read_volatile(r) } & C_DEBUGEN == C_DEBUGEN;
    ENABLED.store(attached, Ordering::Relaxed);
    attached
  }

  pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
  }
}

struct SemihostingLogger;

impl Log for SemihostingLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    debugger::enabled() && metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      // best effort, a lost line is not worth stopping for
      let _ = hprintln!("[{}] {}", record.level(), record.args());
    }
  }

  fn flush(&self) {}
}

static LOGGER: SemihostingLogger = SemihostingLogger;

pub fn init_logging(level: LevelFilter) {
  debugger::init();
  if log::set_logger(&LOGGER).is_ok() {
    log::set_max_level(level);
  }
}
