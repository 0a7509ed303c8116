use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One validation failure, self-describing via `row_ptr` so insertion order
/// across concurrent exports is never load-bearing. `created_at` is stamped
/// by the store at insert time, not supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRecord {
    pub id: u64,
    pub dataset_id: String,
    pub model: String,
    pub row_ptr: String,
    pub error_code: String,
    pub hint: String,
    pub offending: BTreeMap<String, String>,
    pub created_at: String,
}

/// The sole authority on exception history for a dataset. The emitter and
/// validator report findings here rather than through return codes alone.
pub trait ExceptionsStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn add(
        &self,
        dataset_id: &str,
        model: &str,
        row_ptr: &str,
        error_code: &str,
        hint: &str,
        offending: BTreeMap<String, String>,
    ) -> u64;

    fn list(&self, dataset_id: &str, model: Option<&str>) -> Vec<ExceptionRecord>;
    fn clear(&self, dataset_id: &str, model: Option<&str>) -> usize;
    fn count(&self, dataset_id: &str, model: Option<&str>) -> usize;
}

/// `Mutex`-guarded in-memory store. A single coarse lock is sufficient: the
/// only contended operation is `add`, which is O(1), so there is no
/// intra-export locking concern even with several orchestrators running in
/// parallel against the same process.
#[derive(Default)]
pub struct InMemoryExceptionsStore {
    records: Mutex<Vec<ExceptionRecord>>,
    next_id: AtomicU64,
}

impl InMemoryExceptionsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExceptionsStore for InMemoryExceptionsStore {
    fn add(
        &self,
        dataset_id: &str,
        model: &str,
        row_ptr: &str,
        error_code: &str,
        hint: &str,
        offending: BTreeMap<String, String>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let record = ExceptionRecord {
            id,
            dataset_id: dataset_id.to_string(),
            model: model.to_string(),
            row_ptr: row_ptr.to_string(),
            error_code: error_code.to_string(),
            hint: hint.to_string(),
            offending,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.records.lock().unwrap().push(record);
        id
    }

    fn list(&self, dataset_id: &str, model: Option<&str>) -> Vec<ExceptionRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.dataset_id == dataset_id && model.is_none_or(|m| r.model == m))
            .cloned()
            .collect()
    }

    fn clear(&self, dataset_id: &str, model: Option<&str>) -> usize {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !(r.dataset_id == dataset_id && model.is_none_or(|m| r.model == m)));
        before - records.len()
    }

    fn count(&self, dataset_id: &str, model: Option<&str>) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.dataset_id == dataset_id && model.is_none_or(|m| r.model == m))
            .count()
    }
}
