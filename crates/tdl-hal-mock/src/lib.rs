//! Mock HAL implementation for testing the tdlchar device
//!
//! This provides a mock implementation of the HAL trait that can be used
//! for testing the device without a real platform. Debug lines are
//! captured in order, time is simulated, and user copies can be made to
//! fault on demand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tdl_hal::{HalError, HAL};

/// Mock HAL for testing
///
/// Safe to share across threads; every captured line is stored under a
/// mutex so concurrent tests see a single total order.
pub struct MockHal {
    /// Simulated time in nanoseconds
    time: AtomicU64,
    /// Captured debug messages
    debug_log: Mutex<Vec<String>>,
    /// Queued copy faults: each entry fails one `copy_to_user` call
    copy_faults: Mutex<VecDeque<usize>>,
    /// Number of successful user copies
    copies: AtomicU64,
}

impl MockHal {
    /// Create a new mock HAL
    pub fn new() -> Self {
        Self::with_time(0)
    }

    /// Create a mock HAL with a specific starting time
    pub fn with_time(nanos: u64) -> Self {
        Self {
            time: AtomicU64::new(nanos),
            debug_log: Mutex::new(Vec::new()),
            copy_faults: Mutex::new(VecDeque::new()),
            copies: AtomicU64::new(0),
        }
    }

    /// Advance the simulated time by the given duration
    pub fn advance_time(&self, nanos: u64) {
        self.time.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Set the simulated time to a specific value
    pub fn set_time(&self, nanos: u64) {
        self.time.store(nanos, Ordering::SeqCst);
    }

    /// Get all captured debug messages
    pub fn get_debug_log(&self) -> Vec<String> {
        self.log().clone()
    }

    /// Clear the debug log
    pub fn clear_debug_log(&self) {
        self.log().clear();
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.log().iter().any(|msg| msg.contains(substr))
    }

    /// Count logged messages containing `substr`
    pub fn count_log_containing(&self, substr: &str) -> usize {
        self.log().iter().filter(|msg| msg.contains(substr)).count()
    }

    /// Get the number of debug messages
    pub fn debug_log_count(&self) -> usize {
        self.log().len()
    }

    /// Make the next `copy_to_user` fail, reporting `uncopied` bytes
    pub fn fail_next_copy(&self, uncopied: usize) {
        self.faults().push_back(uncopied);
    }

    /// Number of queued copy faults not yet triggered
    pub fn pending_copy_faults(&self) -> usize {
        self.faults().len()
    }

    /// Number of user copies that succeeded
    pub fn successful_copies(&self) -> u64 {
        self.copies.load(Ordering::SeqCst)
    }

    fn log(&self) -> MutexGuard<'_, Vec<String>> {
        self.debug_log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, VecDeque<usize>> {
        self.copy_faults.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl HAL for MockHal {
    fn now_nanos(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    fn debug_write(&self, msg: &str) {
        self.log().push(String::from(msg));
    }

    fn copy_to_user(&self, dst: &mut [u8], src: &[u8]) -> Result<(), HalError> {
        if let Some(uncopied) = self.faults().pop_front() {
            return Err(HalError::BadAddress { uncopied });
        }

        if dst.len() < src.len() {
            return Err(HalError::BadAddress {
                uncopied: src.len() - dst.len(),
            });
        }
        dst[..src.len()].copy_from_slice(src);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
