//! Character device registry
//!
//! Tracks the three pieces of registration a driver module performs on
//! load: a dynamically allocated major number, a device class, and a device
//! node within that class. Nodes are resolved by path (`/dev/<name>`).
//!
//! Dynamic majors are handed out from the top of the range downwards, the
//! way the kernel allocates them.

use std::collections::BTreeMap;
use std::fmt;

use tdl_core::DeviceNumber;

/// Highest dynamically allocated major number
pub const DYNAMIC_MAJOR_MAX: u32 = 254;

/// Lowest dynamically allocated major number
pub const DYNAMIC_MAJOR_MIN: u32 = 234;

/// Directory device nodes appear under
pub const DEV_ROOT: &str = "/dev/";

/// Errors from registry operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A driver with this name already holds a major number
    AlreadyRegistered(String),
    /// Every dynamic major is taken
    NoFreeMajor,
    /// Major number not registered under this name
    NotRegistered { major: u32, name: String },
    /// Class name already in use
    ClassExists(String),
    /// No such class
    ClassNotFound(String),
    /// A node with this name or number already exists
    DeviceExists(String),
    /// No node with this number in the class
    DeviceNotFound(DeviceNumber),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(name) => {
                write!(f, "Driver {} already registered", name)
            }
            RegistryError::NoFreeMajor => write!(f, "No free dynamic major number"),
            RegistryError::NotRegistered { major, name } => {
                write!(f, "Major {} not registered to {}", major, name)
            }
            RegistryError::ClassExists(name) => write!(f, "Class {} already exists", name),
            RegistryError::ClassNotFound(name) => write!(f, "Class {} not found", name),
            RegistryError::DeviceExists(name) => write!(f, "Device {} already exists", name),
            RegistryError::DeviceNotFound(dev) => write!(f, "Device {} not found", dev),
        }
    }
}

impl std::error::Error for RegistryError {}

/// A device node entry
#[derive(Clone, Debug, PartialEq, Eq)]
struct DeviceNode {
    name: String,
    number: DeviceNumber,
}

/// Registry of character drivers, classes and device nodes.
#[derive(Debug, Default)]
pub struct ChrdevRegistry {
    /// major -> driver name
    majors: BTreeMap<u32, String>,
    /// class name -> nodes in that class
    classes: BTreeMap<String, Vec<DeviceNode>>,
}

impl ChrdevRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a dynamic major number for `name`.
    pub fn register_chrdev(&mut self, name: &str) -> Result<u32, RegistryError> {
        if self.majors.values().any(|n| n == name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }

        let major = (DYNAMIC_MAJOR_MIN..=DYNAMIC_MAJOR_MAX)
            .rev()
            .find(|m| !self.majors.contains_key(m))
            .ok_or(RegistryError::NoFreeMajor)?;
        self.majors.insert(major, name.to_string());
        Ok(major)
    }

    /// Release a major number.
    pub fn unregister_chrdev(&mut self, major: u32, name: &str) -> Result<(), RegistryError> {
        match self.majors.get(&major) {
            Some(owner) if owner == name => {
                self.majors.remove(&major);
                Ok(())
            }
            _ => Err(RegistryError::NotRegistered {
                major,
                name: name.to_string(),
            }),
        }
    }

    /// Create an empty device class.
    pub fn class_create(&mut self, class: &str) -> Result<(), RegistryError> {
        if self.classes.contains_key(class) {
            return Err(RegistryError::ClassExists(class.to_string()));
        }
        self.classes.insert(class.to_string(), Vec::new());
        Ok(())
    }

    /// Remove a class along with any nodes left in it.
    pub fn class_destroy(&mut self, class: &str) -> Result<(), RegistryError> {
        self.classes
            .remove(class)
            .map(|_| ())
            .ok_or_else(|| RegistryError::ClassNotFound(class.to_string()))
    }

    /// Create a device node in `class`, returning its path.
    pub fn device_create(
        &mut self,
        class: &str,
        number: DeviceNumber,
        name: &str,
    ) -> Result<String, RegistryError> {
        if self.resolve_name(name).is_some() || self.find_number(number).is_some() {
            return Err(RegistryError::DeviceExists(name.to_string()));
        }
        let nodes = self
            .classes
            .get_mut(class)
            .ok_or_else(|| RegistryError::ClassNotFound(class.to_string()))?;
        nodes.push(DeviceNode {
            name: name.to_string(),
            number,
        });
        Ok(format!("{}{}", DEV_ROOT, name))
    }

    /// Remove the node with `number` from `class`.
    pub fn device_destroy(&mut self, class: &str, number: DeviceNumber) -> Result<(), RegistryError> {
        let nodes = self
            .classes
            .get_mut(class)
            .ok_or_else(|| RegistryError::ClassNotFound(class.to_string()))?;
        let before = nodes.len();
        nodes.retain(|node| node.number != number);
        if nodes.len() == before {
            return Err(RegistryError::DeviceNotFound(number));
        }
        Ok(())
    }

    /// Resolve a `/dev/<name>` path to its device number.
    pub fn resolve(&self, path: &str) -> Option<DeviceNumber> {
        path.strip_prefix(DEV_ROOT)
            .and_then(|name| self.resolve_name(name))
    }

    /// Driver name owning `major`
    pub fn driver_name(&self, major: u32) -> Option<&str> {
        self.majors.get(&major).map(String::as_str)
    }

    /// Number of registered majors
    pub fn major_count(&self) -> usize {
        self.majors.len()
    }

    /// Whether `class` exists
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn resolve_name(&self, name: &str) -> Option<DeviceNumber> {
        self.classes
            .values()
            .flatten()
            .find(|node| node.name == name)
            .map(|node| node.number)
    }

    fn find_number(&self, number: DeviceNumber) -> Option<&DeviceNode> {
        self.classes
            .values()
            .flatten()
            .find(|node| node.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majors_allocated_top_down() {
        let mut reg = ChrdevRegistry::new();
        assert_eq!(reg.register_chrdev("a"), Ok(254));
        assert_eq!(reg.register_chrdev("b"), Ok(253));
        assert_eq!(reg.driver_name(254), Some("a"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = ChrdevRegistry::new();
        reg.register_chrdev("tdlchar").unwrap();
        assert_eq!(
            reg.register_chrdev("tdlchar"),
            Err(RegistryError::AlreadyRegistered("tdlchar".into()))
        );
    }

    #[test]
    fn test_major_exhaustion_and_reuse() {
        let mut reg = ChrdevRegistry::new();
        let total = (DYNAMIC_MAJOR_MAX - DYNAMIC_MAJOR_MIN + 1) as usize;
        for i in 0..total {
            reg.register_chrdev(&format!("drv{}", i)).unwrap();
        }
        assert_eq!(reg.register_chrdev("late"), Err(RegistryError::NoFreeMajor));

        let owner = reg.driver_name(240).unwrap().to_string();
        reg.unregister_chrdev(240, &owner).unwrap();
        assert_eq!(reg.register_chrdev("late"), Ok(240));
    }

    #[test]
    fn test_unregister_wrong_owner() {
        let mut reg = ChrdevRegistry::new();
        let major = reg.register_chrdev("a").unwrap();
        assert!(matches!(
            reg.unregister_chrdev(major, "b"),
            Err(RegistryError::NotRegistered { .. })
        ));
        assert_eq!(reg.major_count(), 1);
    }

    #[test]
    fn test_device_node_lifecycle() {
        let mut reg = ChrdevRegistry::new();
        let major = reg.register_chrdev("tdlchar").unwrap();
        reg.class_create("tdl").unwrap();

        let number = DeviceNumber::new(major, 0);
        assert_eq!(
            reg.device_create("tdl", number, "tdlchar"),
            Ok("/dev/tdlchar".to_string())
        );
        assert_eq!(reg.resolve("/dev/tdlchar"), Some(number));
        assert_eq!(reg.resolve("/dev/other"), None);
        assert_eq!(reg.resolve("tdlchar"), None);

        reg.device_destroy("tdl", number).unwrap();
        assert_eq!(reg.resolve("/dev/tdlchar"), None);
        assert_eq!(
            reg.device_destroy("tdl", number),
            Err(RegistryError::DeviceNotFound(number))
        );
    }

    #[test]
    fn test_class_errors() {
        let mut reg = ChrdevRegistry::new();
        reg.class_create("tdl").unwrap();
        assert_eq!(
            reg.class_create("tdl"),
            Err(RegistryError::ClassExists("tdl".into()))
        );
        assert_eq!(
            reg.device_create("nope", DeviceNumber::new(254, 0), "x"),
            Err(RegistryError::ClassNotFound("nope".into()))
        );
        reg.class_destroy("tdl").unwrap();
        assert!(!reg.has_class("tdl"));
        assert!(reg.class_destroy("tdl").is_err());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut reg = ChrdevRegistry::new();
        reg.class_create("tdl").unwrap();
        reg.device_create("tdl", DeviceNumber::new(254, 0), "tdlchar")
            .unwrap();
        assert!(matches!(
            reg.device_create("tdl", DeviceNumber::new(253, 0), "tdlchar"),
            Err(RegistryError::DeviceExists(_))
        ));
    }
}
