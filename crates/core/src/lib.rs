//! Core types for the fixture store
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Unified value enum with deep structural equality
//! - Error: Error type hierarchy (validation, resolution, persistence)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;
