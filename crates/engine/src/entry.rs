//! Key entries: every value slot registered under one key

use crate::capability::{Call, CallContext};
use crate::slot::{Pattern, ValueSlot};
use crate::store::FixtureStore;
use fixture_core::Value;

/// All slots registered under one key
///
/// Created on first reference to a key and never removed. The ordinal is
/// assigned once and names every fixture recorded for the key.
#[derive(Debug)]
pub struct KeyEntry {
    key: String,
    ordinal: u64,
    slots: Vec<ValueSlot>,
    /// Highest value ordinal assigned or seen on disk
    value_counter: u64,
    origin_name: Option<String>,
}

impl KeyEntry {
    pub(crate) fn new(key: impl Into<String>, ordinal: u64, origin_name: Option<String>) -> Self {
        KeyEntry {
            key: key.into(),
            ordinal,
            slots: Vec::new(),
            value_counter: 0,
            origin_name,
        }
    }

    /// The key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ordinal used in this key's fixture names
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Slots in registration order
    pub fn slots(&self) -> &[ValueSlot] {
        &self.slots
    }

    /// Highest value ordinal assigned or loaded so far
    pub fn value_counter(&self) -> u64 {
        self.value_counter
    }

    /// Blob this entry was first loaded from
    pub fn origin_name(&self) -> Option<&str> {
        self.origin_name.as_deref()
    }

    /// Find the slot that should answer `call`
    ///
    /// Every slot is tried in registration order and the last one that
    /// matches wins, so a later registration overrides an earlier one
    /// without removing it.
    pub fn find_match(&self, store: &FixtureStore, call: &Call) -> Option<usize> {
        let ctx = CallContext {
            store,
            entry: self,
            call,
        };
        let mut found = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.pattern().matches(&ctx) {
                found = Some(index);
            }
        }
        found
    }

    /// Slot at `index`
    pub fn slot(&self, index: usize) -> Option<&ValueSlot> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut ValueSlot> {
        self.slots.get_mut(index)
    }

    /// Slot for `pattern`, creating it if needed
    ///
    /// Literal patterns share a slot with any deep-equal literal.
    /// Predicates cannot be compared, so each one gets a slot of its own.
    pub(crate) fn slot_for(&mut self, pattern: Pattern) -> usize {
        if let Pattern::Literal(parm) = &pattern {
            if let Some(index) = self.literal_slot(parm) {
                return index;
            }
        }
        self.slots.push(ValueSlot::new(pattern));
        self.slots.len() - 1
    }

    fn literal_slot(&self, parm: &Value) -> Option<usize> {
        self.slots.iter().position(|slot| match slot.pattern() {
            Pattern::Literal(existing) => existing == parm,
            Pattern::Predicate(_) => false,
        })
    }

    /// Allocate the next value ordinal (never 0)
    pub(crate) fn next_value_ordinal(&mut self) -> u64 {
        self.value_counter += 1;
        self.value_counter
    }

    /// Make sure future ordinals land past one already on disk
    pub(crate) fn observe_value_ordinal(&mut self, ordinal: u64) {
        self.value_counter = self.value_counter.max(ordinal);
    }
}
