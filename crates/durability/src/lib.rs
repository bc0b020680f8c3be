//! Durability layer for the fixture store
//!
//! This crate handles everything that touches disk:
//!
//! - Codec: rendering values to re-loadable text and parsing them back
//! - Naming: deterministic, sortable fixture file names with ordinals
//! - I/O: directory-backed and in-memory fixture storage
//! - Discovery: finding and parsing key blobs in file name order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod discovery;
pub mod io;
pub mod naming;

pub use codec::{FixtureCodec, JsonCodec};
pub use discovery::{discover_key_blobs, Discovery, FixtureBlob};
pub use io::{BlobIo, FixtureDir, FixtureIo, MemoryFixtureIo};
pub use naming::{BlobKind, FixtureName, NamingScheme};
