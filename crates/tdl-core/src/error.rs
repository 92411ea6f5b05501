//! Error types for device operations.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Linux errno values reported by the device
pub mod errno {
    /// Operation not permitted
    pub const EPERM: i32 = 1;
    /// Bad address
    pub const EFAULT: i32 = 14;
    /// Device or resource busy
    pub const EBUSY: i32 = 16;
    /// No such device
    pub const ENODEV: i32 = 19;
    /// Message too long
    pub const EMSGSIZE: i32 = 90;
}

/// Errors from device operations.
///
/// None of these are fatal to the host: every one is returned to the caller,
/// who may retry, resubmit or abandon the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceError {
    /// Another session holds the device
    Busy,

    /// Copying the message out to the caller failed; nothing was consumed
    TransferFault {
        /// Bytes that could not be copied
        uncopied: usize,
    },

    /// Write payload does not fit next to the terminator
    InputTooLarge {
        /// Length that was offered
        len: usize,
        /// Largest accepted payload
        max: usize,
    },

    /// The caller does not hold the device
    NotHeld,

    /// The device has been torn down
    Offline,
}

impl DeviceError {
    /// errno equivalent of this error
    pub fn errno(&self) -> i32 {
        match self {
            DeviceError::Busy => errno::EBUSY,
            DeviceError::TransferFault { .. } => errno::EFAULT,
            DeviceError::InputTooLarge { .. } => errno::EMSGSIZE,
            DeviceError::NotHeld => errno::EPERM,
            DeviceError::Offline => errno::ENODEV,
        }
    }

    /// Negative errno, as returned through a syscall-style result slot
    pub fn to_result_code(&self) -> i64 {
        -(self.errno() as i64)
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Busy | DeviceError::TransferFault { .. })
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Busy => write!(f, "Device in use by another session"),
            DeviceError::TransferFault { uncopied } => {
                write!(f, "Bad address: {} bytes not copied", uncopied)
            }
            DeviceError::InputTooLarge { len, max } => {
                write!(f, "Input too large: {} bytes, at most {} accepted", len, max)
            }
            DeviceError::NotHeld => write!(f, "Device not held by this session"),
            DeviceError::Offline => write!(f, "Device has been removed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeviceError {}

#[cfg(feature = "std")]
impl From<DeviceError> for std::io::Error {
    fn from(e: DeviceError) -> Self {
        std::io::Error::from_raw_os_error(e.errno())
    }
}
