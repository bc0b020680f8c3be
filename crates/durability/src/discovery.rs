//! Key blob discovery.
//!
//! Finds the key blobs of a fixture directory and parses them, in file name
//! order, ready for the engine to ingest. A file that cannot be read or
//! parsed is reported and skipped; the rest still load.

use crate::io::BlobIo;
use crate::naming::NamingScheme;
use fixture_core::{Error, Result, Value};
use tracing::{debug, warn};

/// One parsed, not yet validated, key blob
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureBlob {
    /// File name the blob was read from (`None` for blobs built in code)
    pub origin_name: Option<String>,
    /// Parsed document: `{key, parm, value}`
    pub document: Value,
}

impl FixtureBlob {
    /// Blob read from a named file
    pub fn named(origin_name: impl Into<String>, document: impl Into<Value>) -> Self {
        FixtureBlob {
            origin_name: Some(origin_name.into()),
            document: document.into(),
        }
    }

    /// Blob with no origin file
    pub fn anonymous(document: impl Into<Value>) -> Self {
        FixtureBlob {
            origin_name: None,
            document: document.into(),
        }
    }
}

/// Result of scanning a fixture directory
#[derive(Debug, Default)]
pub struct Discovery {
    /// Parsed key blobs, sorted by file name
    pub blobs: Vec<FixtureBlob>,
    /// Files that matched but could not be read or parsed
    pub failures: Vec<(String, Error)>,
    /// Generated value blob names; not read, but their ordinals are taken
    pub value_blobs: Vec<String>,
}

/// Read every key blob under `scheme`, sorted by file name.
///
/// Only listing the directory can fail as a whole.
pub fn discover_key_blobs(blobs: &BlobIo, scheme: &NamingScheme) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    for name in blobs.list_names()? {
        if !scheme.is_key_blob(&name) {
            if scheme.parse(&name).is_some() {
                discovery.value_blobs.push(name);
            }
            continue;
        }
        match blobs.read_blob(&name) {
            Ok(document) => {
                debug!(name = %name, "Discovered key blob");
                discovery.blobs.push(FixtureBlob::named(name, document));
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Skipping unreadable key blob");
                discovery.failures.push((name, e));
            }
        }
    }
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FixtureIo, MemoryFixtureIo};
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryFixtureIo>, BlobIo) {
        let io = Arc::new(MemoryFixtureIo::new());
        let blobs = BlobIo::json(Arc::clone(&io));
        (io, blobs)
    }

    #[test]
    fn test_discovers_key_blobs_in_name_order() {
        let (_io, blobs) = setup();
        let doc = Value::from(json!({"key": "a", "parm": 1, "value": {"data": 2}}));
        blobs.write_blob("e2e-00001-000002-key.json", &doc).unwrap();
        blobs.write_blob("e2e-00001-000001-key.json", &doc).unwrap();
        blobs.write_blob("e2e--echo-key.json", &doc).unwrap();

        let found = discover_key_blobs(&blobs, &NamingScheme::default()).unwrap();
        let names: Vec<_> = found
            .blobs
            .iter()
            .map(|b| b.origin_name.clone().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "e2e--echo-key.json",
                "e2e-00001-000001-key.json",
                "e2e-00001-000002-key.json",
            ]
        );
        assert!(found.failures.is_empty());
    }

    #[test]
    fn test_value_blobs_listed_not_read_and_foreign_files_ignored() {
        let (io, blobs) = setup();
        blobs.write_blob("e2e-00001-000001-val.json", &Value::Int(1)).unwrap();
        io.write_text("e2e--notes-val.json", "not json").unwrap();
        io.write_text("README.md", "# fixtures").unwrap();
        io.write_text("other-00001-000001-key.json", "{}").unwrap();

        let found = discover_key_blobs(&blobs, &NamingScheme::default()).unwrap();
        assert!(found.blobs.is_empty());
        assert!(found.failures.is_empty());
        assert_eq!(found.value_blobs, vec!["e2e-00001-000001-val.json"]);
    }

    #[test]
    fn test_unparsable_blob_is_reported_and_skipped() {
        let (io, blobs) = setup();
        io.write_text("e2e-00001-000001-key.json", "const v = {key: 'a'}")
            .unwrap();
        blobs
            .write_blob(
                "e2e-00001-000002-key.json",
                &Value::from(json!({"key": "a", "parm": 1, "value": 2})),
            )
            .unwrap();

        let found = discover_key_blobs(&blobs, &NamingScheme::default()).unwrap();
        assert_eq!(found.blobs.len(), 1);
        assert_eq!(found.failures.len(), 1);
        assert_eq!(found.failures[0].0, "e2e-00001-000001-key.json");
        assert!(matches!(found.failures[0].1, Error::Serialization(_)));
    }
}
