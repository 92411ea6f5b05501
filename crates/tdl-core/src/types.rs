//! Core device types
//!
//! Pure data shared between the buffer state and the runtime driver.

use alloc::string::String;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Name the device is registered under (`/dev/tdlchar`)
pub const DEVICE_NAME: &str = "tdlchar";

/// Device class name (`/sys/class/tdl`)
pub const CLASS_NAME: &str = "tdl";

/// Default message buffer capacity in bytes, terminator slot included
pub const DEFAULT_CAPACITY: usize = 256;

/// Smallest usable capacity: one payload byte plus the terminator
pub const MIN_CAPACITY: usize = 2;

/// Byte stored after the payload so it reads as a bounded C string
pub const TERMINATOR: u8 = 0;

/// Identity of one acquisition of the device.
///
/// Issued by a successful open and presented on every later
/// write/read/release. IDs are never reused while the device is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}", self.0)
    }
}

/// Character device number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceNumber {
    /// Driver-identifying major number
    pub major: u32,
    /// Instance minor number
    pub minor: u32,
}

impl DeviceNumber {
    /// Create a device number
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// State of the admission lock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// No session holds the device
    Free,
    /// A session holds the device
    Held(SessionId),
    /// The device has been torn down and accepts no new sessions
    Retired,
}

impl LockState {
    /// Whether a session currently holds the device
    pub fn is_held(&self) -> bool {
        matches!(self, LockState::Held(_))
    }

    /// The current holder, if any
    pub fn holder(&self) -> Option<SessionId> {
        match self {
            LockState::Held(session) => Some(*session),
            _ => None,
        }
    }
}

/// Point-in-time snapshot of a device, exported as its class attributes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Registered device name
    pub name: String,
    /// Successful acquisitions since load (never reset)
    pub open_count: u64,
    /// Bytes waiting to be read
    pub stored_len: usize,
    /// Buffer capacity including the terminator slot
    pub capacity: usize,
    /// Admission lock state
    pub lock: LockState,
    /// HAL timestamp of the current acquisition, while held
    pub held_since_ns: Option<u64>,
}

/// Outcome of tearing a device down
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    /// A session was still holding the device and was forcibly released
    pub forced: bool,
    /// The session that was abandoned, when `forced`
    pub abandoned: Option<SessionId>,
    /// Final acquisition count
    pub open_count: u64,
}
