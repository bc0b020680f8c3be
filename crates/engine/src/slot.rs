//! Value slots: the recorded values for one (key, parameter pattern) pair
//!
//! A slot plays its values back round-robin. Reading advances a cursor; it
//! never consumes a value, so the Nth playback of the same call returns the
//! Nth recorded value and then wraps to the first one.

use crate::capability::{CallContext, Matcher, Resolver};
use fixture_core::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Field marking a persisted predicate pattern: `{"$matcher": name}`
pub const MATCHER_FIELD: &str = "$matcher";
/// Inline value descriptor field: `{"data": value}`
pub const DATA_FIELD: &str = "data";
/// External value descriptor field: `{"file": name}`
pub const FILE_FIELD: &str = "file";
/// Computed value descriptor field: `{"func": name}`
pub const FUNC_FIELD: &str = "func";

// ============================================================================
// Patterns
// ============================================================================

/// What a slot matches calls against
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches a call whose parameter is deep-equal to this value
    Literal(Value),
    /// Matches a call the predicate accepts
    Predicate(Matcher),
}

impl Pattern {
    /// True if this pattern selects the call in `ctx`
    pub fn matches(&self, ctx: &CallContext<'_>) -> bool {
        match self {
            Pattern::Literal(parm) => *parm == ctx.call.parm,
            Pattern::Predicate(matcher) => matcher.matches(ctx),
        }
    }

    /// Persisted form of the pattern
    pub fn to_document(&self) -> Value {
        match self {
            Pattern::Literal(parm) => parm.clone(),
            Pattern::Predicate(matcher) => Value::single(MATCHER_FIELD, matcher.name()),
        }
    }
}

impl From<Value> for Pattern {
    fn from(parm: Value) -> Self {
        Pattern::Literal(parm)
    }
}

impl From<Matcher> for Pattern {
    fn from(matcher: Matcher) -> Self {
        Pattern::Predicate(matcher)
    }
}

// ============================================================================
// Raw values
// ============================================================================

/// A stored value together with how to materialize it
#[derive(Debug, Clone)]
pub enum RawValue {
    /// The value itself, recorded inline
    Inline(Value),
    /// Name of a value blob, read on demand
    External(String),
    /// Generated per call
    Computed(Resolver),
    /// Undecorated value (in-memory recordings and pre-descriptor fixtures)
    Plain(Value),
}

impl RawValue {
    /// Persisted form of the descriptor
    pub fn to_document(&self) -> Value {
        match self {
            RawValue::Inline(value) => Value::single(DATA_FIELD, value.clone()),
            RawValue::External(name) => Value::single(FILE_FIELD, name.as_str()),
            RawValue::Computed(resolver) => Value::single(FUNC_FIELD, resolver.name()),
            RawValue::Plain(value) => value.clone(),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Plain(value)
    }
}

impl From<Resolver> for RawValue {
    fn from(resolver: Resolver) -> Self {
        RawValue::Computed(resolver)
    }
}

// ============================================================================
// Slot
// ============================================================================

/// Never-read marker for the cursor
const UNREAD: usize = usize::MAX;

/// Ordered values recorded for one pattern, with a playback cursor
///
/// The cursor is interior-mutable so playback can run through a shared
/// reference: playback advances cursors but never changes what is stored.
#[derive(Debug)]
pub struct ValueSlot {
    pattern: Pattern,
    values: Vec<RawValue>,
    /// Index of the value most recently read, or `UNREAD`
    cursor: AtomicUsize,
}

impl ValueSlot {
    /// Empty slot for a pattern
    pub fn new(pattern: Pattern) -> Self {
        ValueSlot {
            pattern,
            values: Vec::new(),
            cursor: AtomicUsize::new(UNREAD),
        }
    }

    /// The slot's pattern
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Recorded values in recording order
    pub fn values(&self) -> &[RawValue] {
        &self.values
    }

    /// Number of recorded values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a value
    pub fn push_raw(&mut self, raw: RawValue) {
        self.values.push(raw);
    }

    /// Index of the value most recently read, if any
    ///
    /// Always in `[0, len)` once something has been read.
    pub fn cursor(&self) -> Option<usize> {
        match self.cursor.load(Ordering::Relaxed) {
            UNREAD => None,
            index => Some(index),
        }
    }

    /// Read the next value round-robin
    ///
    /// The value after the last one is the first. Values appended after a
    /// read are played before wrapping, so recording and then playing back
    /// one call at a time returns each value as it was recorded.
    ///
    /// Concurrent readers each get a distinct step of the rotation.
    pub fn next_raw(&self) -> Option<&RawValue> {
        let len = self.values.len();
        if len == 0 {
            return None;
        }
        let advance = |last: usize| {
            let next = last.wrapping_add(1);
            if next >= len {
                0
            } else {
                next
            }
        };
        let last = match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some(advance(last)))
        {
            Ok(last) | Err(last) => last,
        };
        self.values.get(advance(last))
    }
}
