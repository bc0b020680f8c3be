//! Fixture text codec.
//!
//! Every fixture blob passes through a codec on its way to and from disk.
//! Fixtures are the reviewed source of truth for a test suite, so the codec
//! must produce text that is stable across runs and readable in a diff.

use fixture_core::{Error, Result, Value};

/// Fixture codec trait.
///
/// Renders a value to a re-loadable textual form and parses it back.
/// Codecs only ever see plain data: predicates and computed values are
/// persisted as symbolic references, never as executable text.
pub trait FixtureCodec: Send + Sync {
    /// Render a value to text.
    fn render(&self, value: &Value) -> Result<String>;

    /// Parse text back into a value.
    fn parse(&self, text: &str) -> Result<Value>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Pretty-printed JSON codec.
///
/// Object keys come out sorted (see [`Value`]), one field per line, with a
/// trailing newline so files end cleanly.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a JSON codec
    pub fn new() -> Self {
        JsonCodec
    }
}

impl FixtureCodec for JsonCodec {
    fn render(&self, value: &Value) -> Result<String> {
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        Ok(text)
    }

    fn parse(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn codec_id(&self) -> &str {
        "json"
    }
}
