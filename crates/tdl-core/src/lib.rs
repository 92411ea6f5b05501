//! tdlchar Core - Pure State for the Exclusive Transform Device
//!
//! This crate contains the **HAL-free** half of the tdlchar device: the
//! fixed-capacity message buffer, the case-fold transform, the error and
//! event vocabulary, and runtime-checkable invariants.
//!
//! # Design Principles
//!
//! 1. **No HAL dependency**: Locking, logging and user copies live in `tdl-driver`
//! 2. **No I/O or side effects**: Buffer operations are pure state transformations
//! 3. **Bounded**: Every operation is bounded by the configured capacity
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       tdl-core                           │
//! │                                                          │
//! │   ┌───────────────┐    ┌───────────────┐                │
//! │   │ MessageBuffer │    │  fold_upper   │                │
//! │   │  - bytes      │◀───│  case-fold    │                │
//! │   │  - len        │    └───────────────┘                │
//! │   └───────────────┘                                      │
//! │   ┌───────────────┐    ┌───────────────┐                │
//! │   │  DeviceEvent  │    │  Invariants   │                │
//! │   └───────────────┘    └───────────────┘                │
//! └──────────────────────────────────────────────────────────┘
//!                              │ used by
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                      tdl-driver                          │
//! │   - admission lock (atomic test-and-set)                 │
//! │   - HAL integration (diagnostics, user copies)           │
//! │   - chrdev registry and module lifecycle                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Session IDs, device numbers, lock state, statistics
//! - `error` - `DeviceError` and errno mapping
//! - `transform` - The ASCII upper-case fold
//! - `buffer` - `MessageBuffer`, the read-once store
//! - `event` - Diagnostic events and their log lines
//! - `invariants` - Invariant assertions over a device snapshot
//! - `config` - Device configuration

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod invariants;
pub mod transform;
pub mod types;

pub use buffer::MessageBuffer;
pub use config::{ConfigError, DeviceConfig};
pub use error::{errno, DeviceError};
pub use event::{DeviceEvent, DeviceOp, InitStage, LOG_PREFIX};
pub use invariants::{check_all_invariants, InvariantViolation};
pub use transform::{fold_into, fold_upper};
pub use types::{
    DeviceNumber, DeviceStats, LockState, SessionId, TeardownReport, CLASS_NAME, DEFAULT_CAPACITY,
    DEVICE_NAME, MIN_CAPACITY, TERMINATOR,
};
