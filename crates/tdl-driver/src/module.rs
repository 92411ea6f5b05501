//! Driver module lifecycle
//!
//! `DriverModule::init` brings the device up the way a loadable module
//! does: allocate a major number, create the class, create the node. A
//! failure at any step undoes the earlier ones before returning.
//! `DriverModule::exit` reverses the sequence, tearing the device down
//! first so a client that never closed cannot keep it alive.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tdl_core::{
    ConfigError, DeviceConfig, DeviceError, DeviceEvent, DeviceNumber, DeviceStats, InitStage,
    TeardownReport,
};
use tdl_hal::HAL;

use crate::device::CharDevice;
use crate::file::DeviceFile;
use crate::registry::{ChrdevRegistry, RegistryError};

/// Errors from module load and device lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleError {
    /// Configuration rejected before anything was registered
    Config(ConfigError),
    /// A registration step failed; earlier steps were rolled back
    Registration {
        stage: InitStage,
        source: RegistryError,
    },
    /// Path does not name this module's device
    NoSuchDevice(String),
    /// The device refused the operation
    Device(DeviceError),
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::Config(e) => write!(f, "Invalid configuration: {}", e),
            ModuleError::Registration { stage, source } => {
                write!(f, "Registration failed at {:?}: {}", stage, source)
            }
            ModuleError::NoSuchDevice(path) => write!(f, "No such device: {}", path),
            ModuleError::Device(e) => write!(f, "Device error: {}", e),
        }
    }
}

impl std::error::Error for ModuleError {}

impl From<ConfigError> for ModuleError {
    fn from(e: ConfigError) -> Self {
        ModuleError::Config(e)
    }
}

impl From<DeviceError> for ModuleError {
    fn from(e: DeviceError) -> Self {
        ModuleError::Device(e)
    }
}

/// Attributes published under the device's class entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAttributes {
    /// Class the device belongs to
    pub class: String,
    /// Device number
    pub dev: DeviceNumber,
    /// Node path
    pub node: String,
    /// Live statistics
    pub stats: DeviceStats,
}

/// A loaded driver module owning one device.
pub struct DriverModule<H: HAL> {
    config: DeviceConfig,
    number: DeviceNumber,
    node_path: String,
    device: Arc<CharDevice<H>>,
}

impl<H: HAL> DriverModule<H> {
    /// Load the module: validate, register, create class and node.
    pub fn init(
        hal: H,
        config: DeviceConfig,
        registry: &mut ChrdevRegistry,
    ) -> Result<Self, ModuleError> {
        config.validate()?;

        let device = CharDevice::new(hal, &config);
        device.emit(DeviceEvent::Initializing);

        let major = match registry.register_chrdev(&config.name) {
            Ok(major) => major,
            Err(source) => return Err(init_failed(&device, InitStage::MajorNumber, source)),
        };
        device.emit(DeviceEvent::Registered { major });

        if let Err(source) = registry.class_create(&config.class_name) {
            let _ = registry.unregister_chrdev(major, &config.name);
            return Err(init_failed(&device, InitStage::Class, source));
        }
        device.emit(DeviceEvent::ClassRegistered);

        // Single instance: minor 0
        let number = DeviceNumber::new(major, 0);
        let node_path = match registry.device_create(&config.class_name, number, &config.name) {
            Ok(path) => path,
            Err(source) => {
                let _ = registry.class_destroy(&config.class_name);
                let _ = registry.unregister_chrdev(major, &config.name);
                return Err(init_failed(&device, InitStage::Device, source));
            }
        };
        device.emit(DeviceEvent::DeviceCreated);

        Ok(Self {
            config,
            number,
            node_path,
            device: Arc::new(device),
        })
    }

    /// Unload the module.
    ///
    /// Open `DeviceFile`s outlive this call but every operation on them
    /// fails with `NotHeld`.
    pub fn exit(self, registry: &mut ChrdevRegistry) -> TeardownReport {
        let report = self.device.shutdown();

        let _ = registry.device_destroy(&self.config.class_name, self.number);
        let _ = registry.class_destroy(&self.config.class_name);
        let _ = registry.unregister_chrdev(self.number.major, &self.config.name);

        self.device.emit(DeviceEvent::Goodbye);
        report
    }

    /// Open the device by node path.
    pub fn open(&self, path: &str) -> Result<DeviceFile<H>, ModuleError> {
        if path != self.node_path {
            return Err(ModuleError::NoSuchDevice(path.to_string()));
        }
        Ok(DeviceFile::open(Arc::clone(&self.device))?)
    }

    /// The managed device
    pub fn device(&self) -> &Arc<CharDevice<H>> {
        &self.device
    }

    /// Allocated device number
    pub fn number(&self) -> DeviceNumber {
        self.number
    }

    /// Node path (`/dev/<name>`)
    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    /// Class entry path (`/sys/class/<class>/<name>`)
    pub fn class_path(&self) -> String {
        self.config.class_path()
    }

    /// Configuration the module was loaded with
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Current class attributes
    pub fn attributes(&self) -> ClassAttributes {
        ClassAttributes {
            class: self.config.class_name.clone(),
            dev: self.number,
            node: self.node_path.clone(),
            stats: self.device.stats(),
        }
    }

    /// Class attributes rendered as JSON
    pub fn attributes_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.attributes())
    }
}

fn init_failed<H: HAL>(
    device: &CharDevice<H>,
    stage: InitStage,
    source: RegistryError,
) -> ModuleError {
    device.emit(DeviceEvent::InitFailed { stage });
    ModuleError::Registration { stage, source }
}
