//! Hardware Abstraction Layer for the tdlchar device
//!
//! This crate defines the HAL trait that separates the device from the
//! platform it is hosted on. The device never prints or touches caller
//! memory directly; it goes through these hooks.
//!
//! # Platform Implementations
//!
//! - **Native** (`std` feature): `StdHal`, log lines on stderr, `Instant` clock
//! - **Null**: `NullHal`, drops diagnostics, for model checking and benchmarks
//! - **Mock**: `tdl-hal-mock::MockHal`, captures diagnostics and injects copy faults

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "std")]
mod native;

#[cfg(feature = "std")]
pub use native::StdHal;

/// Hardware Abstraction Layer trait
///
/// Implementations provide platform-specific functionality for:
/// - Debug output (the device's diagnostic sink)
/// - Time measurement
/// - Copying device data out to a caller's buffer
pub trait HAL: Send + Sync + 'static {
    // === Time ===

    /// Get current time in nanoseconds (monotonic)
    fn now_nanos(&self) -> u64;

    // === Debug ===

    /// Write a debug line to the platform's console/log
    ///
    /// Lines arrive in the order the device produced them. Implementations
    /// must not fail or block for long; the device does not check delivery.
    fn debug_write(&self, msg: &str);

    // === User Memory ===

    /// Copy `src` into the caller-owned `dst`
    ///
    /// Platforms that can fault on caller memory override this. The default
    /// copies what fits and reports the remainder as uncopied.
    ///
    /// # Returns
    /// * `Ok(())` - All of `src` was copied
    /// * `Err(HalError::BadAddress { uncopied })` - `uncopied` bytes did not make it
    fn copy_to_user(&self, dst: &mut [u8], src: &[u8]) -> Result<(), HalError> {
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        if n < src.len() {
            return Err(HalError::BadAddress {
                uncopied: src.len() - n,
            });
        }
        Ok(())
    }
}

/// HAL error types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Caller memory could not be accessed
    BadAddress {
        /// Bytes left uncopied
        uncopied: usize,
    },
    /// Operation not supported on this platform
    NotSupported,
    /// Invalid argument
    InvalidArgument,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::BadAddress { uncopied } => {
                write!(f, "Bad address: {} bytes uncopied", uncopied)
            }
            HalError::NotSupported => write!(f, "Operation not supported"),
            HalError::InvalidArgument => write!(f, "Invalid argument"),
        }
    }
}

/// A HAL that discards diagnostics
///
/// Time advances by one nanosecond per query so timestamps stay monotonic.
#[derive(Default)]
pub struct NullHal {
    time: AtomicU64,
}

impl NullHal {
    pub fn new() -> Self {
        Self {
            time: AtomicU64::new(0),
        }
    }
}

impl HAL for NullHal {
    fn now_nanos(&self) -> u64 {
        self.time.fetch_add(1, Ordering::Relaxed)
    }

    fn debug_write(&self, _msg: &str) {}
}
