//! FixtureDB - deterministic record/replay fixtures for offline integration tests
//!
//! Code under test calls out to a dependency through `(key, parm)` pairs. In
//! record mode each call's result is stored as a fixture blob; in playback mode
//! the same calls are answered from those blobs, so end-to-end tests run
//! without the real dependency.
//!
//! # Quick Start
//!
//! ```no_run
//! use fixturedb::{FixtureStore, ReplayConfig, Value};
//!
//! # fn main() -> fixturedb::Result<()> {
//! let mut store = FixtureStore::open(ReplayConfig::default().with_directory("replay"))?;
//! let report = store.load_directory();
//! assert!(report.is_clean());
//!
//! // Record once...
//! store.record("users.get", Value::from("alice"), Value::from("Alice A."))?;
//!
//! // ...and play back on every later run
//! let user = store.playback("users.get", &Value::from("alice"));
//! assert_eq!(user, Some(Value::from("Alice A.")));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `fixture-core`: [`Value`] and the [`Error`] taxonomy
//! - `fixture-durability`: codec, file naming, fixture I/O and discovery
//! - `fixture-engine`: [`FixtureStore`], slots, capabilities and config

pub use fixture_core::{Error, Result, Value};
pub use fixture_durability::{
    BlobIo, BlobKind, FixtureBlob, FixtureCodec, FixtureDir, FixtureIo, FixtureName,
    JsonCodec, MemoryFixtureIo, NamingScheme,
};
pub use fixture_engine::*;
