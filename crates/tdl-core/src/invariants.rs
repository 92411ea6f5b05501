//! Runtime-checkable device invariants
//!
//! Used for assertion checking in tests and after teardown.
//!
//! # Invariants
//!
//! 1. **Buffer Bounds**: Storage is exactly `capacity` bytes and the stored
//!    length never exceeds `capacity - 1`
//! 2. **Termination**: A pending message is followed by the terminator
//! 3. **Lock Accounting**: A held device has been opened at least once

use alloc::string::String;
use alloc::vec::Vec;

use crate::buffer::MessageBuffer;
use crate::types::{LockState, TERMINATOR};

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

/// Check all device invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(
    buffer: &MessageBuffer,
    capacity: usize,
    lock: LockState,
    open_count: u64,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_buffer_bounds(buffer, capacity));
    violations.extend(check_termination(buffer));
    violations.extend(check_lock_accounting(lock, open_count));

    violations
}

/// Invariant 1: storage size is fixed and length stays below it
fn check_buffer_bounds(buffer: &MessageBuffer, capacity: usize) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    if buffer.raw().len() != capacity {
        violations.push(InvariantViolation {
            invariant: "buffer_bounds",
            description: alloc::format!(
                "Storage is {} bytes, configured capacity is {}",
                buffer.raw().len(),
                capacity
            ),
        });
    }

    if buffer.len() >= buffer.raw().len() {
        violations.push(InvariantViolation {
            invariant: "buffer_bounds",
            description: alloc::format!(
                "Stored length {} leaves no terminator slot in {} bytes",
                buffer.len(),
                buffer.raw().len()
            ),
        });
    }

    violations
}

/// Invariant 2: pending message is terminated
fn check_termination(buffer: &MessageBuffer) -> Vec<InvariantViolation> {
    let len = buffer.len();
    match buffer.raw().get(len) {
        Some(&TERMINATOR) => Vec::new(),
        // Consumed messages keep their bytes; only pending ones must be terminated
        Some(_) if len == 0 => Vec::new(),
        Some(byte) => alloc::vec![InvariantViolation {
            invariant: "termination",
            description: alloc::format!(
                "Byte after {}-byte message is 0x{:02x}, not the terminator",
                len,
                byte
            ),
        }],
        None => Vec::new(), // reported by buffer_bounds
    }
}

/// Invariant 3: a holder implies at least one successful open
fn check_lock_accounting(lock: LockState, open_count: u64) -> Vec<InvariantViolation> {
    match lock {
        LockState::Held(session) if open_count == 0 => alloc::vec![InvariantViolation {
            invariant: "lock_accounting",
            description: alloc::format!("Held by {} but open count is 0", session),
        }],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionId;

    #[test]
    fn test_fresh_buffer_holds() {
        let buf = MessageBuffer::new(8);
        assert!(check_all_invariants(&buf, 8, LockState::Free, 0).is_empty());
    }

    #[test]
    fn test_after_write_and_consume() {
        let mut buf = MessageBuffer::new(8);
        buf.store(b"abcdefg").unwrap();
        assert!(check_all_invariants(&buf, 8, LockState::Held(SessionId(1)), 1).is_empty());

        buf.consume();
        assert!(check_all_invariants(&buf, 8, LockState::Free, 1).is_empty());
    }

    #[test]
    fn test_capacity_mismatch_detected() {
        let buf = MessageBuffer::new(8);
        let violations = check_all_invariants(&buf, 16, LockState::Free, 0);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "buffer_bounds");
    }

    #[test]
    fn test_held_without_open_detected() {
        let buf = MessageBuffer::new(8);
        let violations = check_all_invariants(&buf, 8, LockState::Held(SessionId(4)), 0);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "lock_accounting");
    }
}
