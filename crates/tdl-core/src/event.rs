//! Diagnostic events
//!
//! Every state transition of the device is described by a `DeviceEvent`.
//! The driver renders each one to a single ASCII line (via `Display`) and
//! hands it to the HAL log sink. Events are observational only; nothing in
//! the device depends on them being delivered.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Prefix carried by every diagnostic line
pub const LOG_PREFIX: &str = "TDLChar";

/// Device operation named in a diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceOp {
    Open,
    Write,
    Read,
    Release,
}

impl DeviceOp {
    /// Lowercase operation name
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOp::Open => "open",
            DeviceOp::Write => "write",
            DeviceOp::Read => "read",
            DeviceOp::Release => "release",
        }
    }
}

/// Module initialisation step, for failure reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitStage {
    /// Allocating the major number
    MajorNumber,
    /// Creating the device class
    Class,
    /// Creating the device node
    Device,
}

impl InitStage {
    fn describe(&self) -> &'static str {
        match self {
            InitStage::MajorNumber => "register a major number",
            InitStage::Class => "register device class",
            InitStage::Device => "create the device",
        }
    }
}

/// A device state transition worth reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// Module load started
    Initializing,
    /// Major number allocated
    Registered { major: u32 },
    /// Device class created
    ClassRegistered,
    /// Device node created; the device is live
    DeviceCreated,
    /// A module load step failed
    InitFailed { stage: InitStage },
    /// Acquisition succeeded
    Opened { open_count: u64 },
    /// Acquisition refused because another session holds the device
    Busy,
    /// Acquisition refused because the device is torn down
    Offline,
    /// Write accepted
    Received { len: usize },
    /// Write refused as oversized
    Rejected { len: usize, max: usize },
    /// Read delivered bytes to the caller
    Sent { len: usize },
    /// Read could not copy to the caller
    SendFailed { uncopied: usize },
    /// Session released the device
    Closed,
    /// An operation came from a session that does not hold the device
    NotHeld { op: DeviceOp },
    /// Teardown found the device still held and freed it anyway
    ForcedRelease { session: SessionId },
    /// Module unloaded
    Goodbye,
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", LOG_PREFIX)?;
        match self {
            DeviceEvent::Initializing => write!(f, "Initializing the {} LKM", LOG_PREFIX),
            DeviceEvent::Registered { major } => {
                write!(f, "registered correctly with major number {}", major)
            }
            DeviceEvent::ClassRegistered => write!(f, "device class registered correctly"),
            DeviceEvent::DeviceCreated => write!(f, "device class created correctly"),
            DeviceEvent::InitFailed { stage } => write!(f, "failed to {}", stage.describe()),
            DeviceEvent::Opened { open_count } => {
                write!(f, "Device has been opened {} time(s)", open_count)
            }
            DeviceEvent::Busy => write!(f, "Device in use by another process"),
            DeviceEvent::Offline => write!(f, "Device has been removed"),
            DeviceEvent::Received { len } => {
                write!(f, "Received {} characters from the user", len)
            }
            DeviceEvent::Rejected { len, max } => write!(
                f,
                "Rejected {} characters from the user (limit {})",
                len, max
            ),
            DeviceEvent::Sent { len } => write!(f, "Sent {} characters to the user", len),
            DeviceEvent::SendFailed { uncopied } => {
                write!(f, "Failed to send {} characters to the user", uncopied)
            }
            DeviceEvent::Closed => write!(f, "Device successfully closed"),
            DeviceEvent::NotHeld { op } => {
                write!(f, "Refused {} from a session not holding the device", op.as_str())
            }
            DeviceEvent::ForcedRelease { session } => {
                write!(f, "WARNING: unloading while held by {}, forcing release", session)
            }
            DeviceEvent::Goodbye => write!(f, "Goodbye from the LKM!"),
        }
    }
}
