//! Fixture store: load, record and play back `(key, parm) -> value` calls
//!
//! ## Flow
//!
//! - **load**: key blobs (in file name order) are validated and ingested
//! - **playback**: the call's key entry picks a slot, the slot yields its
//!   next raw value, and the raw value is resolved to a [`Value`]
//! - **record**: the call is added to the index and, when writing live,
//!   persisted as a key blob (plus a value blob with external storage)
//!
//! ## Ordinals
//!
//! Every key entry has an ordinal and every recorded value an ordinal within
//! its entry; both appear in fixture names and neither is ever reused.
//! Loading reserves every generated name found on disk, whether or not the
//! file loads and whichever key it holds, so recording after a load never
//! overwrites an existing fixture. Ordinal 0 marks hand-authored fixtures
//! and is never generated.
//!
//! The store is an explicit context object: build one per test run and hand
//! it to the code under test. Playback takes `&self` but is not free of side
//! effects, since it advances the round-robin cursor of the slot it reads.

use crate::capability::{Call, CallContext, CapabilityRegistry};
use crate::config::ReplayConfig;
use crate::entry::KeyEntry;
use crate::slot::{Pattern, RawValue, ValueSlot, DATA_FIELD, FILE_FIELD, FUNC_FIELD, MATCHER_FIELD};
use fixture_core::{Error, Result, Value};
use fixture_durability::{
    discover_key_blobs, BlobIo, BlobKind, FixtureBlob, FixtureDir, FixtureIo, FixtureName,
    MemoryFixtureIo, NamingScheme,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Field names of a key blob
const KEY_FIELD: &str = "key";
const PARM_FIELD: &str = "parm";
const VALUE_FIELD: &str = "value";
const ORIGIN_FIELD: &str = "originName";

/// Outcome of [`FixtureStore::load`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Blobs ingested
    pub loaded: usize,
    /// Blobs skipped, one error each
    pub errors: Vec<Error>,
}

impl LoadReport {
    /// True if every blob loaded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A resolved playback value
#[derive(Debug)]
pub struct Resolution {
    /// The value to hand back to the caller
    pub value: Value,
    /// Set when an external value could not be read; `value` is then the
    /// unresolved `{"file": name}` reference
    pub error: Option<Error>,
}

impl Resolution {
    fn ok(value: Value) -> Self {
        Resolution { value, error: None }
    }
}

/// Outcome of [`FixtureStore::record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Kept in memory only (`write_live` is off)
    InMemory,
    /// Persisted to fixture blobs
    Written {
        /// Key blob name
        key_blob: String,
        /// Value blob name, with external value storage
        value_blob: Option<String>,
    },
}

/// A key blob that passed validation
struct DecodedBlob {
    key: String,
    pattern: Pattern,
    raw: RawValue,
    origin_name: Option<String>,
}

/// The record/replay fixture store
pub struct FixtureStore {
    config: ReplayConfig,
    naming: NamingScheme,
    blobs: BlobIo,
    registry: CapabilityRegistry,
    entries: Vec<KeyEntry>,
    /// key -> position in `entries` (first-seen order)
    index: FxHashMap<String, usize>,
    /// Highest key ordinal assigned or seen on disk
    key_count: u64,
    /// key ordinal -> highest value ordinal seen on disk
    disk_value_ordinals: FxHashMap<u64, u64>,
    fixture_file_count: u64,
}

impl FixtureStore {
    /// Store backed by `config.directory`
    pub fn open(config: ReplayConfig) -> Result<Self> {
        let dir = FixtureDir::new(&config.directory);
        Self::with_io(config, dir)
    }

    /// Store with nothing on disk
    pub fn in_memory(config: ReplayConfig) -> Result<Self> {
        Self::with_io(config, MemoryFixtureIo::new())
    }

    /// Store backed by any fixture storage
    pub fn with_io(config: ReplayConfig, io: impl FixtureIo + 'static) -> Result<Self> {
        config.validate()?;
        Ok(FixtureStore {
            naming: config.naming(),
            config,
            blobs: BlobIo::json(io),
            registry: CapabilityRegistry::new(),
            entries: Vec::new(),
            index: FxHashMap::default(),
            key_count: 0,
            disk_value_ordinals: FxHashMap::default(),
            fixture_file_count: 0,
        })
    }

    /// Use `registry` to resolve named matchers and resolvers in fixtures
    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Named matchers and resolvers
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Mutable access to the registry, to add capabilities before loading
    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Naming scheme for this store's fixtures
    pub fn naming(&self) -> &NamingScheme {
        &self.naming
    }

    /// Number of distinct key ordinals handed out or found on disk
    pub fn key_count(&self) -> u64 {
        self.key_count
    }

    /// Key blobs loaded plus key blobs written
    pub fn fixture_file_count(&self) -> u64 {
        self.fixture_file_count
    }

    /// Entry for a key
    pub fn entry(&self, key: &str) -> Option<&KeyEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// All entries in first-seen order
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    // ========================================================================
    // Index mutation
    // ========================================================================

    /// Add `raw` to the slot for `(key, pattern)`, creating entry and slot
    /// as needed
    ///
    /// This is the one place the index grows; load and record both go
    /// through it.
    pub fn register_correspondence(
        &mut self,
        key: &str,
        pattern: Pattern,
        raw: RawValue,
        origin_name: Option<&str>,
    ) -> (&KeyEntry, &ValueSlot) {
        let (entry_index, slot_index) = self.slot_for(key, pattern, origin_name, None);
        self.push_raw(entry_index, slot_index, raw);
        let entry = &self.entries[entry_index];
        (entry, &entry.slots()[slot_index])
    }

    fn slot_for(
        &mut self,
        key: &str,
        pattern: Pattern,
        origin_name: Option<&str>,
        disk_ordinal: Option<u64>,
    ) -> (usize, usize) {
        let entry_index = match self.index.get(key) {
            Some(&index) => index,
            None => {
                let ordinal = match disk_ordinal {
                    Some(ordinal) if !self.ordinal_taken(ordinal) => {
                        debug!(key, ordinal, "Adopted key ordinal from disk");
                        self.key_count = self.key_count.max(ordinal);
                        ordinal
                    }
                    _ => self.next_key_ordinal(),
                };
                self.entries.push(KeyEntry::new(
                    key,
                    ordinal,
                    origin_name.map(str::to_string),
                ));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let slot_index = self.entries[entry_index].slot_for(pattern);
        (entry_index, slot_index)
    }

    fn push_raw(&mut self, entry_index: usize, slot_index: usize, raw: RawValue) {
        if let Some(slot) = self.entries[entry_index].slot_mut(slot_index) {
            slot.push_raw(raw);
        }
    }

    fn next_key_ordinal(&mut self) -> u64 {
        self.key_count += 1;
        self.key_count
    }

    fn ordinal_taken(&self, ordinal: u64) -> bool {
        self.entries.iter().any(|e| e.ordinal() == ordinal)
    }

    /// Mark the ordinals of an on-disk name as used
    ///
    /// Returns the parsed name for generated names; hand-authored and
    /// foreign names reserve nothing.
    fn reserve_disk_name(&mut self, name: &str) -> Option<FixtureName> {
        let parsed = self.naming.parse(name).filter(|n| !n.is_hand_authored())?;
        self.key_count = self.key_count.max(parsed.key_ordinal);
        let highest = self.disk_value_ordinals.entry(parsed.key_ordinal).or_insert(0);
        *highest = (*highest).max(parsed.value_ordinal);
        Some(parsed)
    }

    /// Move each entry's value counter past the files on disk under its
    /// key ordinal, including files that hold another key
    fn observe_disk_value_ordinals(&mut self) {
        for entry in &mut self.entries {
            if let Some(&highest) = self.disk_value_ordinals.get(&entry.ordinal()) {
                entry.observe_value_ordinal(highest);
            }
        }
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Ingest parsed key blobs, in the order given
    ///
    /// Supply blobs sorted by file name so ordinals are ingested
    /// consistently. Invalid blobs are reported and skipped.
    pub fn load(&mut self, blobs: impl IntoIterator<Item = FixtureBlob>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut decoded = Vec::new();
        for blob in blobs {
            // Reserved before validation: a rejected file still owns its name
            let name = blob_origin(&blob).and_then(|origin| self.reserve_disk_name(origin));
            match self.decode_blob(blob) {
                Ok(blob) => decoded.push((blob, name)),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid fixture");
                    report.errors.push(e);
                }
            }
        }

        for (blob, name) in decoded {
            let disk_ordinal = name.map(|n| n.key_ordinal);
            let (entry_index, slot_index) = self.slot_for(
                &blob.key,
                blob.pattern,
                blob.origin_name.as_deref(),
                disk_ordinal,
            );
            self.push_raw(entry_index, slot_index, blob.raw);
            self.fixture_file_count += 1;
            report.loaded += 1;
        }
        self.observe_disk_value_ordinals();

        info!(
            loaded = report.loaded,
            skipped = report.errors.len(),
            keys = self.entries.len(),
            "Fixtures loaded"
        );
        report
    }

    /// Discover and load every key blob in the fixture directory
    pub fn load_directory(&mut self) -> LoadReport {
        let discovery = match discover_key_blobs(&self.blobs, &self.naming) {
            Ok(discovery) => discovery,
            Err(e) => {
                warn!(error = %e, "Cannot list fixture directory");
                return LoadReport {
                    loaded: 0,
                    errors: vec![e],
                };
            }
        };
        for name in &discovery.value_blobs {
            self.reserve_disk_name(name);
        }
        for (name, _) in &discovery.failures {
            self.reserve_disk_name(name);
        }
        let mut report = self.load(discovery.blobs);
        for (name, e) in discovery.failures {
            report
                .errors
                .push(Error::validation(Some(&name), format!("unreadable: {}", e)));
        }
        report
    }

    fn decode_blob(&self, blob: FixtureBlob) -> Result<DecodedBlob> {
        let FixtureBlob {
            origin_name,
            document,
        } = blob;
        let fields = match document {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::validation(
                    origin_name.as_deref(),
                    format!("expected an object, got {}", other.type_name()),
                ))
            }
        };
        let origin_name = origin_name.or_else(|| {
            fields
                .get(ORIGIN_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let origin = origin_name.as_deref();

        let mut problems = Vec::new();
        let key = match fields.get(KEY_FIELD) {
            None | Some(Value::Null) => {
                problems.push("missing key".to_string());
                None
            }
            Some(Value::String(key)) if key.is_empty() => {
                problems.push("key is empty".to_string());
                None
            }
            Some(Value::String(key)) => Some(key.clone()),
            Some(other) => {
                problems.push(format!("key not a string ({})", other.type_name()));
                None
            }
        };
        let pattern = match fields.get(PARM_FIELD) {
            None | Some(Value::Null) => {
                problems.push("missing parm".to_string());
                None
            }
            Some(parm) => self.decode_pattern(parm).map_err(|p| problems.push(p)).ok(),
        };
        let raw = match fields.get(VALUE_FIELD) {
            None | Some(Value::Null) => {
                problems.push("missing value".to_string());
                None
            }
            Some(value) => self.decode_raw(value).map_err(|p| problems.push(p)).ok(),
        };

        match (key, pattern, raw) {
            (Some(key), Some(pattern), Some(raw)) if problems.is_empty() => Ok(DecodedBlob {
                key,
                pattern,
                raw,
                origin_name,
            }),
            _ => Err(Error::validation(origin, problems.join(", "))),
        }
    }

    fn decode_pattern(&self, parm: &Value) -> std::result::Result<Pattern, String> {
        match single_field(parm) {
            Some((MATCHER_FIELD, Value::String(name))) => self
                .registry
                .matcher(name)
                .cloned()
                .map(Pattern::Predicate)
                .ok_or_else(|| format!("unknown matcher '{}'", name)),
            _ => Ok(Pattern::Literal(parm.clone())),
        }
    }

    fn decode_raw(&self, value: &Value) -> std::result::Result<RawValue, String> {
        match single_field(value) {
            Some((FUNC_FIELD, Value::String(name))) => self
                .registry
                .resolver(name)
                .cloned()
                .map(RawValue::Computed)
                .ok_or_else(|| format!("unknown resolver '{}'", name)),
            Some((DATA_FIELD, data)) => Ok(RawValue::Inline(data.clone())),
            Some((FILE_FIELD, Value::String(name))) => Ok(RawValue::External(name.clone())),
            _ => Ok(RawValue::Plain(value.clone())),
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Value recorded for `(key, parm)`, or `None` if nothing matches
    ///
    /// `None` is distinct from a recorded `Value::Null`. An unreadable
    /// external value is logged and the unresolved reference returned;
    /// use [`playback_resolution`](Self::playback_resolution) to see the
    /// error.
    pub fn playback(&self, key: &str, parm: &Value) -> Option<Value> {
        self.playback_resolution(key, parm).map(|r| r.value)
    }

    /// Like [`playback`](Self::playback), but reports resolution errors
    pub fn playback_resolution(&self, key: &str, parm: &Value) -> Option<Resolution> {
        let entry = self.entry(key)?;
        let call = Call::new(key, parm.clone());
        let slot = entry.slot(entry.find_match(self, &call)?)?;
        let raw = slot.next_raw()?;
        let ctx = CallContext {
            store: self,
            entry,
            call: &call,
        };
        Some(self.resolve_value(raw, &ctx))
    }

    /// Materialize a raw value
    ///
    /// Computed values are generated, inline data returned, and external
    /// references read (only with external value storage enabled). Anything
    /// else is returned as stored.
    pub fn resolve_value(&self, raw: &RawValue, ctx: &CallContext<'_>) -> Resolution {
        match raw {
            RawValue::Computed(resolver) => Resolution::ok(resolver.resolve(ctx)),
            RawValue::Inline(value) | RawValue::Plain(value) => Resolution::ok(value.clone()),
            RawValue::External(name) if self.config.use_external_value_storage => {
                match self.blobs.read_blob(name) {
                    Ok(value) => Resolution::ok(value),
                    Err(e) => {
                        warn!(
                            name = %name,
                            key = %ctx.call.key,
                            error = %e,
                            "Cannot read external value, returning reference"
                        );
                        Resolution {
                            value: raw.to_document(),
                            error: Some(Error::resolution(name.as_str(), e)),
                        }
                    }
                }
            }
            RawValue::External(_) => Resolution::ok(raw.to_document()),
        }
    }

    // ========================================================================
    // Record
    // ========================================================================

    /// Record that `key` called with `parm` returned `value`
    ///
    /// With `write_live` on, the value blob (if any) is written before the
    /// key blob, and the value joins the index only once both writes
    /// succeed. A failed write is returned as a persistence error; the
    /// ordinal it consumed is not reused.
    pub fn record(
        &mut self,
        key: &str,
        parm: impl Into<Pattern>,
        value: impl Into<Value>,
    ) -> Result<RecordOutcome> {
        let pattern = parm.into();
        let value = value.into();
        let parm_document = pattern.to_document();
        let (entry_index, slot_index) = self.slot_for(key, pattern, None, None);

        if !self.config.write_live {
            self.push_raw(entry_index, slot_index, RawValue::Plain(value));
            return Ok(RecordOutcome::InMemory);
        }

        let entry = &mut self.entries[entry_index];
        let key_ordinal = entry.ordinal();
        let value_ordinal = entry.next_value_ordinal();
        let key_blob = self.naming.blob_name(BlobKind::Key, key_ordinal, value_ordinal);

        let (raw, value_blob) = if self.config.use_external_value_storage {
            let value_blob = self
                .naming
                .blob_name(BlobKind::Value, key_ordinal, value_ordinal);
            self.blobs.write_blob(&value_blob, &value)?;
            (RawValue::External(value_blob.clone()), Some(value_blob))
        } else {
            (RawValue::Inline(value), None)
        };

        let mut document = BTreeMap::new();
        document.insert(KEY_FIELD.to_string(), Value::from(key));
        document.insert(PARM_FIELD.to_string(), parm_document);
        document.insert(VALUE_FIELD.to_string(), raw.to_document());
        document.insert(ORIGIN_FIELD.to_string(), Value::from(key_blob.as_str()));
        self.blobs.write_blob(&key_blob, &Value::Object(document))?;

        self.fixture_file_count += 1;
        self.push_raw(entry_index, slot_index, raw);
        debug!(key, key_blob = %key_blob, "Recorded fixture");
        Ok(RecordOutcome::Written {
            key_blob,
            value_blob,
        })
    }
}

impl std::fmt::Debug for FixtureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureStore")
            .field("config", &self.config)
            .field("keys", &self.entries.len())
            .field("key_count", &self.key_count)
            .field("fixture_file_count", &self.fixture_file_count)
            .finish_non_exhaustive()
    }
}

/// File name a blob came from, or the name recorded inside it
fn blob_origin(blob: &FixtureBlob) -> Option<&str> {
    blob.origin_name
        .as_deref()
        .or_else(|| blob.document.get(ORIGIN_FIELD).and_then(Value::as_str))
}

/// `(field, value)` if `value` is an object with exactly one field
fn single_field(value: &Value) -> Option<(&str, &Value)> {
    let fields = value.as_object()?;
    if fields.len() != 1 {
        return None;
    }
    fields.iter().next().map(|(k, v)| (k.as_str(), v))
}
