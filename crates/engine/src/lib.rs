//! Record/replay engine for the fixture store
//!
//! This crate ties the lower layers together:
//! - Store: the `(key, parm) -> value` index with load, record and playback
//! - Slots: per-pattern value lists with round-robin playback
//! - Capabilities: named matchers and value generators fixtures refer to
//! - Config: fixture directory, naming and write behavior (TOML + env)
//!
//! The engine is the only component that knows about:
//! - Key and value ordinals
//! - Validation of loaded fixtures
//! - Resolution of inline, external and computed values

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod config;
pub mod entry;
pub mod slot;
pub mod store;

pub use capability::{Call, CallContext, CapabilityRegistry, Matcher, Resolver};
pub use config::{ConfigError, ReplayConfig, CONFIG_FILE_NAME};
pub use entry::KeyEntry;
pub use slot::{Pattern, RawValue, ValueSlot};
pub use store::{FixtureStore, LoadReport, RecordOutcome, Resolution};
