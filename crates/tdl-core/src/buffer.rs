//! Message buffer - the device's only data
//!
//! A fixed-capacity byte store with read-once semantics. A write replaces
//! the message; a successful read hands out a view of it and the caller then
//! consumes it, after which the buffer reports empty until the next write.
//!
//! The buffer knows nothing about sessions or locking; the driver only lets
//! the current holder reach it.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::DeviceError;
use crate::transform::fold_into;
use crate::types::{MIN_CAPACITY, TERMINATOR};

/// Fixed-capacity, read-once message store.
#[derive(Clone, Debug)]
pub struct MessageBuffer {
    /// Backing storage, always exactly `capacity` bytes
    bytes: Vec<u8>,
    /// Valid bytes since the last write (0 once consumed)
    len: usize,
}

impl MessageBuffer {
    /// Create an empty buffer.
    ///
    /// Capacities below `MIN_CAPACITY` are raised to it so there is always
    /// room for the terminator.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.max(MIN_CAPACITY)],
            len: 0,
        }
    }

    /// Total capacity, terminator slot included
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Largest payload a single write accepts
    pub fn max_payload(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Bytes waiting to be read
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing is waiting to be read
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Replace the message with the upper-cased `input`.
    ///
    /// The folded bytes land in `[0, n)`, the terminator at `n`. Oversized
    /// input is rejected before anything is touched.
    pub fn store(&mut self, input: &[u8]) -> Result<usize, DeviceError> {
        let max = self.max_payload();
        if input.len() > max {
            return Err(DeviceError::InputTooLarge {
                len: input.len(),
                max,
            });
        }

        let n = fold_into(&mut self.bytes[..input.len()], input);
        self.bytes[n] = TERMINATOR;
        self.len = n;
        Ok(n)
    }

    /// The first `min(len, max)` message bytes, without consuming them.
    pub fn pending(&self, max: usize) -> &[u8] {
        &self.bytes[..self.len.min(max)]
    }

    /// Mark the message as delivered.
    pub fn consume(&mut self) {
        self.len = 0;
    }

    /// Raw view of the backing storage (for invariant checks)
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }
}
