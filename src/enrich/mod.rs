// src/enrich/mod.rs
pub mod local;
pub mod remote;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::debug;

pub use local::LocalFileLookup;
pub use remote::{ExecReader, RemoteQuery, RemoteReader};

/// Key/value metadata for one job, in document order.
pub type MetadataBag = Map<String, Value>;

/// Entity name → metadata, kept in the order the entities were dispatched.
///
/// Inserting a name that is already present replaces its bag in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentMapping {
    entries: Vec<(String, MetadataBag)>,
}

impl EnrichmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bag: MetadataBag) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = bag,
            None => self.entries.push((name, bag)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetadataBag> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataBag)> {
        self.entries.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of all bag keys, in first-seen order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for (_, bag) in &self.entries {
            for key in bag.keys() {
                if !keys.iter().any(|k| k == key) {
                    keys.push(key.clone());
                }
            }
        }
        keys
    }
}

impl FromIterator<(String, MetadataBag)> for EnrichmentMapping {
    fn from_iter<I: IntoIterator<Item = (String, MetadataBag)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (name, bag) in iter {
            mapping.insert(name, bag);
        }
        mapping
    }
}

/// Something that can attach metadata to a set of jobs.
///
/// Implementations never fail as a whole: a job whose metadata cannot be
/// obtained is left out or given an empty bag.
pub trait EnrichmentSource: Send + Sync {
    fn enrich<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, EnrichmentMapping>;
}

/// Enrichment turned off: always an empty mapping.
pub struct NoEnrichment;

impl EnrichmentSource for NoEnrichment {
    fn enrich<'a>(&'a self, _names: &'a [String]) -> BoxFuture<'a, EnrichmentMapping> {
        async { EnrichmentMapping::new() }.boxed()
    }
}

/// Parse a metadata document. Anything that is not a JSON object is an
/// empty bag; blank input is an empty bag too.
pub fn parse_bag(entity: &str, bytes: &[u8]) -> MetadataBag {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return MetadataBag::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(entity, kind = json_kind(&other), "metadata is not an object");
            MetadataBag::new()
        }
        Err(e) => {
            debug!(entity, error = %e, "unparsable metadata");
            MetadataBag::new()
        }
    }
}

/// Text shown in a table cell for a metadata value.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
