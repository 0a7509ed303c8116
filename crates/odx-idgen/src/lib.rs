//! Deterministic external-ID generation: slugging, `id_template` parsing and
//! rendering, and per-model duplicate-suffix tracking.

mod dedup;
mod error;
mod slug;
mod template;

pub use dedup::DedupTracker;
pub use error::TemplateError;
pub use slug::{slug, slug_with_max};
pub use template::IdTemplate;

use std::collections::BTreeMap;

/// Render the final external ID for one row: evaluate `template` against
/// `row`, truncate to the 60-character base budget, hand it to `tracker` for
/// dedup suffixing, and cap the result at 64 characters.
pub fn render_id(
    template: &IdTemplate,
    row: &BTreeMap<String, String>,
    tracker: &mut DedupTracker,
) -> String {
    let base_id = template.render_base_id(row);
    tracker.record(&base_id)
}
