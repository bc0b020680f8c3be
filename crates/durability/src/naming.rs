//! Fixture file naming
//!
//! Generated fixtures are named
//!
//! ```text
//! {prefix}-{key ordinal}-{value ordinal}{suffix}.{extension}
//! e2e-00001-000001-key.json
//! e2e-00001-000001-val.json
//! ```
//!
//! Ordinals are zero-padded so that names sort lexicographically in
//! recording order. Generated ordinals start at 1; ordinal 0 is reserved
//! for hand-authored fixtures, which the recorder never overwrites.
//! Names that do not follow the scheme at all parse as `None` and are
//! treated like ordinal 0.

/// Which half of a recorded correspondence a blob holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// `{key, parm, value}` blob
    Key,
    /// Raw value referenced from a key blob
    Value,
}

/// Ordinals decoded from a generated fixture name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureName {
    /// Ordinal of the key entry
    pub key_ordinal: u64,
    /// Ordinal of the value within its key entry
    pub value_ordinal: u64,
    /// Key or value blob
    pub kind: BlobKind,
}

impl FixtureName {
    /// True if either ordinal is the reserved hand-authored ordinal
    pub fn is_hand_authored(&self) -> bool {
        self.key_ordinal == 0 || self.value_ordinal == 0
    }
}

/// Naming scheme for one fixture directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    /// Filename prefix (e.g. `e2e`)
    pub prefix: String,
    /// Suffix for key blobs (e.g. `-key`)
    pub key_suffix: String,
    /// Suffix for value blobs (e.g. `-val`)
    pub value_suffix: String,
    /// File extension without the dot (e.g. `json`)
    pub extension: String,
    /// Zero-padding width of the key ordinal
    pub key_pad: usize,
    /// Zero-padding width of the value ordinal
    pub value_pad: usize,
}

impl Default for NamingScheme {
    fn default() -> Self {
        NamingScheme {
            prefix: "e2e".to_string(),
            key_suffix: "-key".to_string(),
            value_suffix: "-val".to_string(),
            extension: "json".to_string(),
            key_pad: 5,
            value_pad: 6,
        }
    }
}

impl NamingScheme {
    /// Base name shared by the key and value blob of one recording
    ///
    /// An ordinal wider than its pad is written in full rather than truncated.
    pub fn base_name(&self, key_ordinal: u64, value_ordinal: u64) -> String {
        format!(
            "{}-{:0kw$}-{:0vw$}",
            self.prefix,
            key_ordinal,
            value_ordinal,
            kw = self.key_pad,
            vw = self.value_pad
        )
    }

    /// Full file name for a blob
    pub fn blob_name(&self, kind: BlobKind, key_ordinal: u64, value_ordinal: u64) -> String {
        format!(
            "{}{}",
            self.base_name(key_ordinal, value_ordinal),
            self.suffixed_extension(kind)
        )
    }

    /// `{suffix}.{extension}` for a blob kind
    pub fn suffixed_extension(&self, kind: BlobKind) -> String {
        let suffix = match kind {
            BlobKind::Key => &self.key_suffix,
            BlobKind::Value => &self.value_suffix,
        };
        format!("{}.{}", suffix, self.extension)
    }

    /// True if `name` belongs to this directory's key blobs
    ///
    /// Matches on prefix and `{key_suffix}.{extension}` only, so
    /// hand-authored names like `e2e--echo-key.json` qualify too.
    pub fn is_key_blob(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.suffixed_extension(BlobKind::Key))
    }

    /// Decode the ordinals from a generated name
    pub fn parse(&self, name: &str) -> Option<FixtureName> {
        let rest = name.strip_prefix(&self.prefix)?.strip_prefix('-')?;
        [BlobKind::Key, BlobKind::Value]
            .into_iter()
            .find_map(|kind| {
                let ordinals = rest.strip_suffix(&self.suffixed_extension(kind))?;
                let (key, value) = ordinals.split_once('-')?;
                Some(FixtureName {
                    key_ordinal: parse_ordinal(key)?,
                    value_ordinal: parse_ordinal(value)?,
                    kind,
                })
            })
    }
}

fn parse_ordinal(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
