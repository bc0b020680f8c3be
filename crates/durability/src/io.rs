//! Fixture file I/O.
//!
//! [`FixtureIo`] is the seam between the engine and wherever fixture text
//! lives. [`FixtureDir`] keeps it in a directory on disk; [`MemoryFixtureIo`]
//! keeps it in memory for tests of the engine itself. [`BlobIo`] layers a
//! [`FixtureCodec`] on top so callers deal in [`Value`]s.
//!
//! All calls are blocking and run to completion. There is no locking
//! between processes: one process owns a fixture directory at a time.

use crate::codec::{FixtureCodec, JsonCodec};
use fixture_core::{Error, Result, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Storage for fixture text, addressed by flat file name.
pub trait FixtureIo: Send + Sync {
    /// Read the full text of a blob.
    fn read_text(&self, name: &str) -> Result<String>;

    /// Create or replace a blob.
    fn write_text(&self, name: &str, text: &str) -> Result<()>;

    /// List every blob name, in no particular order.
    fn list_names(&self) -> Result<Vec<String>>;
}

impl<T: FixtureIo + ?Sized> FixtureIo for Arc<T> {
    fn read_text(&self, name: &str) -> Result<String> {
        (**self).read_text(name)
    }

    fn write_text(&self, name: &str, text: &str) -> Result<()> {
        (**self).write_text(name, text)
    }

    fn list_names(&self) -> Result<Vec<String>> {
        (**self).list_names()
    }
}

/// Reject names that would escape the fixture directory.
///
/// Names can come from `{"file": ...}` references inside loaded fixtures.
fn check_name(name: &str) -> Result<()> {
    let escapes = name.contains(|c: char| c == '/' || c == '\\');
    if name.is_empty() || name == "." || name == ".." || escapes {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid fixture name '{}'", name),
        )));
    }
    Ok(())
}

// ============================================================================
// Directory-backed storage
// ============================================================================

/// Fixture blobs stored as files in one directory.
///
/// The directory is created on the first write; a missing directory lists
/// as empty so a fresh checkout can start recording immediately.
#[derive(Debug, Clone)]
pub struct FixtureDir {
    root: PathBuf,
}

impl FixtureDir {
    /// Use `root` as the fixture directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        FixtureDir {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The fixture directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a blob
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl FixtureIo for FixtureDir {
    fn read_text(&self, name: &str) -> Result<String> {
        check_name(name)?;
        Ok(std::fs::read_to_string(self.path_of(name))?)
    }

    fn write_text(&self, name: &str, text: &str) -> Result<()> {
        check_name(name)?;
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_of(name);
        std::fs::write(&path, text)?;
        debug!(path = %path.display(), bytes = text.len(), "Wrote fixture blob");
        Ok(())
    }

    fn list_names(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            // Non-UTF-8 names can never match a fixture prefix
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Fixture blobs held in memory.
///
/// Writes can be switched off with [`MemoryFixtureIo::set_read_only`] to
/// exercise persistence failures.
#[derive(Debug, Default)]
pub struct MemoryFixtureIo {
    blobs: RwLock<BTreeMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryFixtureIo {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Delete a blob, returning its text if it existed
    pub fn remove(&self, name: &str) -> Option<String> {
        self.blobs.write().remove(name)
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl FixtureIo for MemoryFixtureIo {
    fn read_text(&self, name: &str) -> Result<String> {
        check_name(name)?;
        self.blobs.read().get(name).cloned().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no fixture named '{}'", name),
            ))
        })
    }

    fn write_text(&self, name: &str, text: &str) -> Result<()> {
        check_name(name)?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "fixture storage is read-only",
            )));
        }
        self.blobs.write().insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn list_names(&self) -> Result<Vec<String>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }
}

// ============================================================================
// Value-level access
// ============================================================================

/// Fixture storage plus the codec used to read and write it.
pub struct BlobIo {
    io: Box<dyn FixtureIo>,
    codec: Box<dyn FixtureCodec>,
}

impl BlobIo {
    /// Combine storage with a codec
    pub fn new(io: Box<dyn FixtureIo>, codec: Box<dyn FixtureCodec>) -> Self {
        BlobIo { io, codec }
    }

    /// Storage with the default JSON codec
    pub fn json(io: impl FixtureIo + 'static) -> Self {
        Self::new(Box::new(io), Box::new(JsonCodec::new()))
    }

    /// Read and parse a blob
    pub fn read_blob(&self, name: &str) -> Result<Value> {
        let text = self.io.read_text(name)?;
        self.codec.parse(&text)
    }

    /// Render and write a blob
    ///
    /// Any failure, rendering included, is reported as a persistence error.
    pub fn write_blob(&self, name: &str, value: &Value) -> Result<()> {
        let text = self
            .codec
            .render(value)
            .map_err(|e| Error::persistence(name, e))?;
        self.io
            .write_text(name, &text)
            .map_err(|e| Error::persistence(name, e))
    }

    /// List every blob name, sorted
    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut names = self.io.list_names()?;
        names.sort();
        Ok(names)
    }

    /// The codec in use
    pub fn codec(&self) -> &dyn FixtureCodec {
        self.codec.as_ref()
    }
}

impl std::fmt::Debug for BlobIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobIo")
            .field("codec", &self.codec.codec_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_dir_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FixtureDir::new(temp_dir.path().join("replay"));

        dir.write_text("e2e-00001-000001-key.json", "{}\n").unwrap();
        assert_eq!(dir.read_text("e2e-00001-000001-key.json").unwrap(), "{}\n");
        assert!(dir.path_of("e2e-00001-000001-key.json").exists());
    }

    #[test]
    fn test_dir_missing_lists_empty() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FixtureDir::new(temp_dir.path().join("does-not-exist"));
        assert!(dir.list_names().unwrap().is_empty());
    }

    #[test]
    fn test_dir_lists_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FixtureDir::new(temp_dir.path());
        dir.write_text("b.json", "1").unwrap();
        dir.write_text("a.json", "2").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();

        let mut names = dir.list_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_dir_read_missing_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FixtureDir::new(temp_dir.path());
        assert!(matches!(dir.read_text("nope.json"), Err(Error::Io(_))));
    }

    #[test]
    fn test_names_cannot_escape_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = FixtureDir::new(temp_dir.path());
        assert!(dir.read_text("../secret.json").is_err());
        assert!(dir.write_text("sub/x.json", "{}").is_err());
        assert!(dir.read_text("..").is_err());
        assert!(dir.read_text("").is_err());
    }

    #[test]
    fn test_memory_read_only_rejects_writes() {
        let io = MemoryFixtureIo::new();
        io.write_text("a.json", "1").unwrap();
        io.set_read_only(true);
        assert!(io.write_text("b.json", "2").is_err());
        io.set_read_only(false);
        io.write_text("b.json", "2").unwrap();
        assert_eq!(io.len(), 2);
    }

    #[test]
    fn test_memory_remove() {
        let io = MemoryFixtureIo::new();
        io.write_text("a.json", "1").unwrap();
        assert_eq!(io.remove("a.json").as_deref(), Some("1"));
        assert!(io.is_empty());
        assert!(io.read_text("a.json").is_err());
    }

    #[test]
    fn test_blob_io_round_trip() {
        let blobs = BlobIo::json(MemoryFixtureIo::new());
        let value = Value::from(json!({"ret": "retval for k2"}));
        blobs.write_blob("e2e-00001-000002-val.json", &value).unwrap();
        assert_eq!(blobs.read_blob("e2e-00001-000002-val.json").unwrap(), value);
    }

    #[test]
    fn test_blob_io_write_failure_is_persistence_error() {
        let io = MemoryFixtureIo::new();
        io.set_read_only(true);
        let blobs = BlobIo::json(io);
        let err = blobs
            .write_blob("e2e-00001-000001-key.json", &Value::Null)
            .unwrap_err();
        match err {
            Error::Persistence { name, .. } => assert_eq!(name, "e2e-00001-000001-key.json"),
            other => panic!("Wrong error variant: {:?}", other),
        }
    }

    #[test]
    fn test_shared_memory_io_sees_writes() {
        let io = Arc::new(MemoryFixtureIo::new());
        let blobs = BlobIo::json(Arc::clone(&io));
        blobs.write_blob("a.json", &Value::Int(1)).unwrap();
        assert_eq!(io.read_text("a.json").unwrap(), "1\n");
    }

    #[test]
    fn test_blob_io_lists_sorted() {
        let blobs = BlobIo::json(MemoryFixtureIo::new());
        blobs.write_blob("c", &Value::Null).unwrap();
        blobs.write_blob("a", &Value::Null).unwrap();
        blobs.write_blob("b", &Value::Null).unwrap();
        assert_eq!(blobs.list_names().unwrap(), vec!["a", "b", "c"]);
    }
}
