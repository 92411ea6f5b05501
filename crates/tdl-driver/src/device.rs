//! The exclusive transform device
//!
//! `CharDevice` owns the message buffer and the admission lock. The lock is
//! a single atomic word holding the current session ID:
//!
//! ```text
//!   FREE (0) ──open──▶ HELD (session) ──release──▶ FREE
//!                      HELD ──open──▶ Busy, stays HELD
//!   any ──shutdown──▶ RETIRED (u64::MAX), no further sessions
//! ```
//!
//! Acquisition is one compare-and-swap and never waits for the holder. Every
//! operation, `open` included, runs under the buffer mutex, so the lock word,
//! open count and acquisition time always change together as seen by
//! `stats`, `check_invariants` and `shutdown`. Write, read and release
//! validate the caller's session against the word under that mutex, so a
//! stale or foreign session can never touch the message.

use std::sync::PoisonError;

use tdl_core::{
    check_all_invariants, DeviceConfig, DeviceError, DeviceEvent, DeviceOp, DeviceStats,
    InvariantViolation, LockState, MessageBuffer, SessionId, TeardownReport,
};
use tdl_hal::{HalError, HAL};

use crate::sync::{AtomicU64, Mutex, MutexGuard, Ordering};

/// Lock word value when no session holds the device
const FREE: u64 = 0;

/// Lock word value once the device is torn down
const RETIRED: u64 = u64::MAX;

/// Single-client, read-once, upper-casing byte device.
pub struct CharDevice<H: HAL> {
    /// Platform hooks: diagnostics and user copies
    hal: H,
    /// Registered name
    name: String,
    /// Buffer capacity, terminator included
    capacity: usize,
    /// Admission lock word: FREE, RETIRED or the holder's session ID
    holder: AtomicU64,
    /// Next session ID to hand out
    next_session: AtomicU64,
    /// Successful acquisitions since load
    open_count: AtomicU64,
    /// HAL time of the current acquisition
    held_since: AtomicU64,
    /// The message
    buffer: Mutex<MessageBuffer>,
}

impl<H: HAL> CharDevice<H> {
    /// Create a device in the FREE state with an empty buffer.
    ///
    /// The configuration is assumed valid (see `DeviceConfig::validate`).
    pub fn new(hal: H, config: &DeviceConfig) -> Self {
        let buffer = MessageBuffer::new(config.capacity);
        Self {
            hal,
            name: config.name.clone(),
            capacity: buffer.capacity(),
            holder: AtomicU64::new(FREE),
            next_session: AtomicU64::new(1),
            open_count: AtomicU64::new(0),
            held_since: AtomicU64::new(0),
            buffer: Mutex::new(buffer),
        }
    }

    /// Create a device with the stock `tdlchar` configuration
    pub fn with_defaults(hal: H) -> Self {
        Self::new(hal, &DeviceConfig::default())
    }

    /// The HAL this device reports to
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Registered device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer capacity, terminator included
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire the device.
    ///
    /// Fails immediately with `Busy` if another session holds it.
    pub fn open(&self) -> Result<SessionId, DeviceError> {
        let _buffer = self.lock_buffer();
        let candidate = self.next_session.fetch_add(1, Ordering::Relaxed);

        match self
            .holder
            .compare_exchange(FREE, candidate, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.held_since.store(self.hal.now_nanos(), Ordering::Relaxed);
                let open_count = self.open_count.fetch_add(1, Ordering::AcqRel) + 1;
                self.emit(DeviceEvent::Opened { open_count });
                Ok(SessionId(candidate))
            }
            Err(RETIRED) => {
                self.emit(DeviceEvent::Offline);
                Err(DeviceError::Offline)
            }
            Err(_) => {
                self.emit(DeviceEvent::Busy);
                Err(DeviceError::Busy)
            }
        }
    }

    /// Store the upper-cased `input` as the message.
    ///
    /// Returns the number of bytes accepted, always `input.len()`.
    pub fn write(&self, session: SessionId, input: &[u8]) -> Result<usize, DeviceError> {
        let mut buffer = self.lock_buffer();
        self.check_holder(session, DeviceOp::Write)?;

        match buffer.store(input) {
            Ok(n) => {
                self.emit(DeviceEvent::Received { len: n });
                Ok(n)
            }
            Err(e) => {
                if let DeviceError::InputTooLarge { len, max } = e {
                    self.emit(DeviceEvent::Rejected { len, max });
                }
                Err(e)
            }
        }
    }

    /// Copy up to `dst.len()` message bytes out and consume the message.
    ///
    /// A second read before the next write returns 0. Any successful read
    /// consumes the whole message, even one with an empty `dst`. On a copy
    /// fault the message is left in place for a retry.
    pub fn read(&self, session: SessionId, dst: &mut [u8]) -> Result<usize, DeviceError> {
        let mut buffer = self.lock_buffer();
        self.check_holder(session, DeviceOp::Read)?;

        let pending = buffer.pending(dst.len());
        let n = pending.len();
        if let Err(e) = self.hal.copy_to_user(&mut dst[..n], pending) {
            let uncopied = match e {
                HalError::BadAddress { uncopied } => uncopied,
                _ => n,
            };
            self.emit(DeviceEvent::SendFailed { uncopied });
            return Err(DeviceError::TransferFault { uncopied });
        }

        buffer.consume();
        self.emit(DeviceEvent::Sent { len: n });
        Ok(n)
    }

    /// Give the device up so the next client can acquire it.
    ///
    /// Only the holding session may release; anything else gets `NotHeld`
    /// and leaves the lock untouched.
    pub fn release(&self, session: SessionId) -> Result<(), DeviceError> {
        let _buffer = self.lock_buffer();

        let released = is_session_word(session.0)
            && self
                .holder
                .compare_exchange(session.0, FREE, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
        if !released {
            self.emit(DeviceEvent::NotHeld {
                op: DeviceOp::Release,
            });
            return Err(DeviceError::NotHeld);
        }

        self.emit(DeviceEvent::Closed);
        Ok(())
    }

    /// Tear the device down.
    ///
    /// A session still holding the device is dropped with a warning; it
    /// and every later caller get `NotHeld`/`Offline`. Calling this twice is
    /// harmless.
    pub fn shutdown(&self) -> TeardownReport {
        let _buffer = self.lock_buffer();

        let previous = self.holder.swap(RETIRED, Ordering::AcqRel);
        let abandoned = if is_session_word(previous) {
            Some(SessionId(previous))
        } else {
            None
        };
        if let Some(session) = abandoned {
            self.emit(DeviceEvent::ForcedRelease { session });
        }

        TeardownReport {
            forced: abandoned.is_some(),
            abandoned,
            open_count: self.open_count.load(Ordering::Acquire),
        }
    }

    /// Current lock state
    pub fn lock_state(&self) -> LockState {
        match self.holder.load(Ordering::Acquire) {
            FREE => LockState::Free,
            RETIRED => LockState::Retired,
            id => LockState::Held(SessionId(id)),
        }
    }

    /// Successful acquisitions since load
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::Acquire)
    }

    /// Snapshot of the device for diagnostics
    pub fn stats(&self) -> DeviceStats {
        let buffer = self.lock_buffer();
        let lock = self.lock_state();
        DeviceStats {
            name: self.name.clone(),
            open_count: self.open_count(),
            stored_len: buffer.len(),
            capacity: self.capacity,
            lock,
            held_since_ns: lock
                .is_held()
                .then(|| self.held_since.load(Ordering::Relaxed)),
        }
    }

    /// Check device invariants (empty when all hold)
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let buffer = self.lock_buffer();
        check_all_invariants(&buffer, self.capacity, self.lock_state(), self.open_count())
    }

    /// Report an event to the HAL log sink
    pub(crate) fn emit(&self, event: DeviceEvent) {
        self.hal.debug_write(&event.to_string());
    }

    fn check_holder(&self, session: SessionId, op: DeviceOp) -> Result<(), DeviceError> {
        if is_session_word(session.0) && self.holder.load(Ordering::Acquire) == session.0 {
            return Ok(());
        }
        self.emit(DeviceEvent::NotHeld { op });
        Err(DeviceError::NotHeld)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, MessageBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: HAL> Drop for CharDevice<H> {
    fn drop(&mut self) {
        if self.holder.load(Ordering::Acquire) != RETIRED {
            self.shutdown();
        }
    }
}

/// Whether a lock word value names a session rather than a state
fn is_session_word(word: u64) -> bool {
    word != FREE && word != RETIRED
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use tdl_hal_mock::MockHal;

    fn device() -> CharDevice<MockHal> {
        CharDevice::with_defaults(MockHal::new())
    }

    #[test]
    fn test_initial_state() {
        let dev = device();
        assert_eq!(dev.lock_state(), LockState::Free);
        assert_eq!(dev.open_count(), 0);
        assert_eq!(dev.capacity(), 256);
        assert_eq!(dev.name(), "tdlchar");
        assert!(dev.check_invariants().is_empty());
    }

    #[test]
    fn test_open_write_read_release() {
        let dev = device();
        let s = dev.open().unwrap();
        assert_eq!(dev.lock_state(), LockState::Held(s));

        assert_eq!(dev.write(s, b"abc"), Ok(3));
        let mut out = [0u8; 256];
        assert_eq!(dev.read(s, &mut out), Ok(3));
        assert_eq!(&out[..3], b"ABC");

        assert_eq!(dev.release(s), Ok(()));
        assert_eq!(dev.lock_state(), LockState::Free);
    }

    #[test]
    fn test_second_open_is_busy() {
        let dev = device();
        let s = dev.open().unwrap();
        assert_eq!(dev.open(), Err(DeviceError::Busy));
        assert_eq!(dev.lock_state(), LockState::Held(s));
        assert_eq!(dev.open_count(), 1);
        assert!(dev.hal().has_log_containing("Device in use by another process"));
    }

    #[test]
    fn test_read_once() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"hello").unwrap();

        let mut out = [0u8; 16];
        assert_eq!(dev.read(s, &mut out), Ok(5));
        assert_eq!(dev.read(s, &mut out), Ok(0));
    }

    #[test]
    fn test_short_read_truncates_and_consumes() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"hello").unwrap();

        let mut out = [0u8; 2];
        assert_eq!(dev.read(s, &mut out), Ok(2));
        assert_eq!(&out, b"HE");

        let mut rest = [0u8; 8];
        assert_eq!(dev.read(s, &mut rest), Ok(0));
    }

    #[test]
    fn test_empty_read_consumes_message() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"gone").unwrap();

        assert_eq!(dev.read(s, &mut []), Ok(0));
        assert!(dev.hal().has_log_containing("Sent 0 characters"));
        assert_eq!(dev.stats().stored_len, 0);

        let mut out = [0u8; 8];
        assert_eq!(dev.read(s, &mut out), Ok(0));
    }

    #[test]
    fn test_oversized_write_rejected() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"keep").unwrap();

        let big = vec![b'a'; 256];
        assert_eq!(
            dev.write(s, &big),
            Err(DeviceError::InputTooLarge { len: 256, max: 255 })
        );

        let mut out = [0u8; 256];
        assert_eq!(dev.read(s, &mut out), Ok(4));
        assert_eq!(&out[..4], b"KEEP");
    }

    #[test]
    fn test_transfer_fault_keeps_message() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"abc").unwrap();

        dev.hal().fail_next_copy(3);
        let mut out = [0u8; 16];
        assert_eq!(
            dev.read(s, &mut out),
            Err(DeviceError::TransferFault { uncopied: 3 })
        );
        assert!(dev.hal().has_log_containing("Failed to send 3 characters"));

        assert_eq!(dev.read(s, &mut out), Ok(3));
        assert_eq!(&out[..3], b"ABC");
    }

    #[test]
    fn test_foreign_session_rejected() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"mine").unwrap();

        let other = SessionId(s.0 + 1);
        assert_eq!(dev.write(other, b"theirs"), Err(DeviceError::NotHeld));
        let mut out = [0u8; 16];
        assert_eq!(dev.read(other, &mut out), Err(DeviceError::NotHeld));
        assert_eq!(dev.release(other), Err(DeviceError::NotHeld));
        assert_eq!(dev.lock_state(), LockState::Held(s));

        assert_eq!(dev.read(s, &mut out), Ok(4));
        assert_eq!(&out[..4], b"MINE");
    }

    #[test]
    fn test_reserved_session_words_rejected() {
        let dev = device();
        assert_eq!(dev.write(SessionId(0), b"x"), Err(DeviceError::NotHeld));
        assert_eq!(dev.release(SessionId(0)), Err(DeviceError::NotHeld));
        assert_eq!(dev.release(SessionId(u64::MAX)), Err(DeviceError::NotHeld));
        assert_eq!(dev.lock_state(), LockState::Free);
    }

    #[test]
    fn test_stale_session_after_release() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.release(s).unwrap();

        assert_eq!(dev.write(s, b"late"), Err(DeviceError::NotHeld));
        assert_eq!(dev.release(s), Err(DeviceError::NotHeld));
    }

    #[test]
    fn test_sessions_are_distinct() {
        let dev = device();
        let a = dev.open().unwrap();
        dev.release(a).unwrap();
        let b = dev.open().unwrap();
        assert_ne!(a, b);
        assert_eq!(dev.open_count(), 2);
        assert!(dev.hal().has_log_containing("opened 2 time(s)"));
    }

    #[test]
    fn test_shutdown_forces_release() {
        let dev = device();
        let s = dev.open().unwrap();

        let report = dev.shutdown();
        assert!(report.forced);
        assert_eq!(report.abandoned, Some(s));
        assert_eq!(report.open_count, 1);
        assert_eq!(dev.lock_state(), LockState::Retired);
        assert!(dev.hal().has_log_containing("forcing release"));

        assert_eq!(dev.write(s, b"x"), Err(DeviceError::NotHeld));
        assert_eq!(dev.open(), Err(DeviceError::Offline));

        let again = dev.shutdown();
        assert!(!again.forced);
    }

    #[test]
    fn test_shutdown_when_free_is_quiet() {
        let dev = device();
        let report = dev.shutdown();
        assert!(!report.forced);
        assert!(!dev.hal().has_log_containing("WARNING"));
    }

    #[test]
    fn test_stats_snapshot() {
        let dev = CharDevice::with_defaults(MockHal::with_time(5_000));
        let s = dev.open().unwrap();
        dev.write(s, b"abcd").unwrap();

        let stats = dev.stats();
        assert_eq!(stats.open_count, 1);
        assert_eq!(stats.stored_len, 4);
        assert_eq!(stats.capacity, 256);
        assert_eq!(stats.lock, LockState::Held(s));
        assert_eq!(stats.held_since_ns, Some(5_000));

        dev.release(s).unwrap();
        assert_eq!(dev.stats().held_since_ns, None);
    }

    #[test]
    fn test_diagnostics_in_order() {
        let dev = device();
        let s = dev.open().unwrap();
        dev.write(s, b"abc").unwrap();
        let mut out = [0u8; 8];
        dev.read(s, &mut out).unwrap();
        dev.release(s).unwrap();

        assert_eq!(
            dev.hal().get_debug_log(),
            vec![
                "TDLChar: Device has been opened 1 time(s)",
                "TDLChar: Received 3 characters from the user",
                "TDLChar: Sent 3 characters to the user",
                "TDLChar: Device successfully closed",
            ]
        );
    }

    #[test]
    fn test_custom_capacity() {
        let config = DeviceConfig {
            capacity: 4,
            ..DeviceConfig::default()
        };
        let dev = CharDevice::new(MockHal::new(), &config);
        let s = dev.open().unwrap();
        assert_eq!(dev.write(s, b"abc"), Ok(3));
        assert_eq!(
            dev.write(s, b"abcd"),
            Err(DeviceError::InputTooLarge { len: 4, max: 3 })
        );
        assert!(dev.check_invariants().is_empty());
    }
}
