//! Programmatic matchers and value generators
//!
//! Some fixtures cannot be expressed as a literal parameter and a literal
//! value: a parameter may need to match a whole family of calls, or a value
//! may need to embed the current time. Test authors register named
//! [`Matcher`]s and [`Resolver`]s in code; fixtures on disk refer to them by
//! name (`{"$matcher": "..."}` for a parameter, `{"func": "..."}` for a
//! value). Fixture text is never evaluated.

use crate::entry::KeyEntry;
use crate::store::FixtureStore;
use fixture_core::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A call presented to playback or record
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Key identifying the dependency operation
    pub key: String,
    /// Parameter the operation was called with
    pub parm: Value,
}

impl Call {
    /// Build a call
    pub fn new(key: impl Into<String>, parm: impl Into<Value>) -> Self {
        Call {
            key: key.into(),
            parm: parm.into(),
        }
    }
}

/// Everything a matcher or resolver gets to look at
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// Store the call is being played back against
    pub store: &'a FixtureStore,
    /// Entry registered under the call's key
    pub entry: &'a KeyEntry,
    /// The call itself
    pub call: &'a Call,
}

type MatchFn = dyn Fn(&CallContext<'_>) -> bool + Send + Sync;
type ResolveFn = dyn Fn(&CallContext<'_>) -> Value + Send + Sync;

/// Named predicate over calls
#[derive(Clone)]
pub struct Matcher {
    name: Arc<str>,
    func: Arc<MatchFn>,
}

impl Matcher {
    /// Wrap a predicate under a name
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> bool + Send + Sync + 'static,
    {
        Matcher {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the predicate
    pub fn matches(&self, ctx: &CallContext<'_>) -> bool {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.name).finish()
    }
}

/// Named value generator
#[derive(Clone)]
pub struct Resolver {
    name: Arc<str>,
    func: Arc<ResolveFn>,
}

impl Resolver {
    /// Wrap a generator under a name
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> Value + Send + Sync + 'static,
    {
        Resolver {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce the value for a call
    pub fn resolve(&self, ctx: &CallContext<'_>) -> Value {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolver").field(&self.name).finish()
    }
}

/// Lookup tables that let loaded fixtures refer to code by name
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    matchers: FxHashMap<String, Matcher>,
    resolvers: FxHashMap<String, Resolver>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a matcher, replacing any previous one with the same name
    pub fn register_matcher(&mut self, matcher: Matcher) -> Option<Matcher> {
        self.matchers.insert(matcher.name().to_string(), matcher)
    }

    /// Register a resolver, replacing any previous one with the same name
    pub fn register_resolver(&mut self, resolver: Resolver) -> Option<Resolver> {
        self.resolvers.insert(resolver.name().to_string(), resolver)
    }

    /// Builder form of [`register_matcher`](Self::register_matcher)
    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.register_matcher(matcher);
        self
    }

    /// Builder form of [`register_resolver`](Self::register_resolver)
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.register_resolver(resolver);
        self
    }

    /// Look up a matcher
    pub fn matcher(&self, name: &str) -> Option<&Matcher> {
        self.matchers.get(name)
    }

    /// Look up a resolver
    pub fn resolver(&self, name: &str) -> Option<&Resolver> {
        self.resolvers.get(name)
    }
}
