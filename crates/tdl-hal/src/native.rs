//! Native HAL backed by the standard library
//!
//! Diagnostic lines go to stderr with a dmesg-style `[seconds.micros]`
//! timestamp measured from HAL creation.

use std::io::Write;
use std::time::Instant;

use crate::HAL;

/// Host-process HAL
pub struct StdHal {
    boot: Instant,
}

impl StdHal {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    /// Render one log line with its timestamp
    pub fn format_line(nanos: u64, msg: &str) -> String {
        format!(
            "[{:>5}.{:06}] {}",
            nanos / 1_000_000_000,
            (nanos % 1_000_000_000) / 1_000,
            msg
        )
    }
}

impl Default for StdHal {
    fn default() -> Self {
        Self::new()
    }
}

impl HAL for StdHal {
    fn now_nanos(&self) -> u64 {
        self.boot.elapsed().as_nanos() as u64
    }

    fn debug_write(&self, msg: &str) {
        let line = Self::format_line(self.now_nanos(), msg);
        // Best-effort: delivery failures are dropped
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
}
