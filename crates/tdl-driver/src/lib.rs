//! tdlchar Driver - Runtime Wrapper for the Exclusive Transform Device
//!
//! This crate wraps the pure buffer state from `tdl-core` with everything
//! that needs a platform or concurrency:
//!
//! - `device` - `CharDevice`: atomic admission lock, holder checks, HAL diagnostics
//! - `file` - `DeviceFile`: RAII session with `std::io::Read`/`Write`
//! - `registry` - `ChrdevRegistry`: major numbers, classes, device nodes
//! - `module` - `DriverModule`: load/unload sequence and class attributes
//! - `loom_tests` - Concurrency tests using loom (with `loom` feature)
//!
//! # Example
//!
//! ```
//! use tdl_core::DeviceConfig;
//! use tdl_driver::{ChrdevRegistry, DriverModule};
//! use tdl_hal::NullHal;
//! use std::io::{Read, Write};
//!
//! let mut registry = ChrdevRegistry::new();
//! let module = DriverModule::init(NullHal::new(), DeviceConfig::default(), &mut registry).unwrap();
//!
//! let mut file = module.open("/dev/tdlchar").unwrap();
//! file.write_all(b"abc").unwrap();
//! let mut response = [0u8; 256];
//! let n = file.read(&mut response).unwrap();
//! assert_eq!(&response[..n], b"ABC");
//! file.close().unwrap();
//!
//! module.exit(&mut registry);
//! ```
//!
//! # Running Loom Tests
//!
//! ```bash
//! cargo test --package tdl-driver --features loom -- --test-threads=1 loom
//! ```

pub mod device;
pub mod file;
pub mod module;
pub mod registry;
mod sync;


pub use device::CharDevice;
pub use file::DeviceFile;
pub use module::{ClassAttributes, DriverModule, ModuleError};
pub use registry::{ChrdevRegistry, RegistryError};
