use std::collections::{HashMap, HashSet};

/// Tracks base external IDs seen within one model's emit pass and assigns
/// `_2`, `_3`, ... suffixes to later occurrences of the same base ID.
///
/// Lifetime is exactly one model's emit pass — the orchestrator constructs
/// (or resets) a fresh tracker before rendering IDs for the next model.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<String>,
    counts: HashMap<String, u32>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `base_id`, returning the final external ID
    /// (unsuffixed on first occurrence, `_2`/`_3`/... thereafter), truncated
    /// to 64 characters.
    pub fn record(&mut self, base_id: &str) -> String {
        let final_id = if self.seen.insert(base_id.to_string()) {
            base_id.to_string()
        } else {
            let count = self.counts.entry(base_id.to_string()).or_insert(1);
            *count += 1;
            format!("{base_id}_{count}")
        };
        final_id.chars().take(64).collect()
    }

    /// True if `record` has already produced a suffix for this base ID.
    pub fn duplicate_count(&self, base_id: &str) -> Option<u32> {
        self.counts.get(base_id).copied()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_unsuffixed() {
        let mut tracker = DedupTracker::new();
        assert_eq!(tracker.record("partner_acme"), "partner_acme");
    }

    #[test]
    fn subsequent_occurrences_get_numbered_suffixes() {
        let mut tracker = DedupTracker::new();
        assert_eq!(tracker.record("partner_jane"), "partner_jane");
        assert_eq!(tracker.record("partner_jane"), "partner_jane_2");
        assert_eq!(tracker.record("partner_jane"), "partner_jane_3");
    }

    #[test]
    fn reset_forgets_prior_occurrences() {
        let mut tracker = DedupTracker::new();
        tracker.record("x");
        tracker.reset();
        assert_eq!(tracker.record("x"), "x");
    }
}
