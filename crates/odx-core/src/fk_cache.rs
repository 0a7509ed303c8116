use std::collections::{HashMap, HashSet};

/// Map from model name to the set of external IDs successfully emitted for
/// that model within the current export run. Written only by the
/// orchestrator, read only by the validator. No persistence, no
/// invalidation — a single export run is its unit of life.
#[derive(Debug, Default)]
pub struct FkCache {
    sets: HashMap<String, HashSet<String>>,
}

impl FkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, model: &str, external_id: &str) -> bool {
        self.sets.get(model).is_some_and(|ids| ids.contains(external_id))
    }

    pub fn insert_many(&mut self, model: &str, ids: impl IntoIterator<Item = String>) {
        self.sets.entry(model.to_string()).or_default().extend(ids);
    }
}
