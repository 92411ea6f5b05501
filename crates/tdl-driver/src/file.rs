//! File-descriptor style access to a device
//!
//! A `DeviceFile` is one open session. It reads and writes through
//! `std::io::Read`/`std::io::Write` with device errors surfaced as the
//! matching OS errno, and gives the device back when closed or dropped.

use std::io;
use std::sync::Arc;

use tdl_core::{DeviceError, SessionId};
use tdl_hal::HAL;

use crate::device::CharDevice;

/// An open handle on a `CharDevice`
pub struct DeviceFile<H: HAL> {
    device: Arc<CharDevice<H>>,
    /// `None` once closed
    session: Option<SessionId>,
}

impl<H: HAL> DeviceFile<H> {
    /// Acquire `device` and wrap the session.
    pub fn open(device: Arc<CharDevice<H>>) -> Result<Self, DeviceError> {
        let session = device.open()?;
        Ok(Self {
            device,
            session: Some(session),
        })
    }

    /// The session this handle holds, if still open
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// The underlying device
    pub fn device(&self) -> &Arc<CharDevice<H>> {
        &self.device
    }

    /// Write a whole message, returning device errors unconverted.
    pub fn write_message(&mut self, msg: &[u8]) -> Result<usize, DeviceError> {
        let session = self.active()?;
        self.device.write(session, msg)
    }

    /// Read the pending message into `buf`, returning device errors unconverted.
    pub fn read_message(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let session = self.active()?;
        self.device.read(session, buf)
    }

    /// Release the device now rather than on drop.
    pub fn close(mut self) -> Result<(), DeviceError> {
        let session = self.session.take().ok_or(DeviceError::NotHeld)?;
        self.device.release(session)
    }

    fn active(&self) -> Result<SessionId, DeviceError> {
        self.session.ok_or(DeviceError::NotHeld)
    }
}

impl<H: HAL> io::Read for DeviceFile<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_message(buf).map_err(io::Error::from)
    }
}

impl<H: HAL> io::Write for DeviceFile<H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_message(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<H: HAL> Drop for DeviceFile<H> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            // Already torn down if this fails; nothing left to free
            let _ = self.device.release(session);
        }
    }
}
