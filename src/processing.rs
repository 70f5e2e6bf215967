use crate::types::{PharmacyRecord, Selection};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Distinct, trimmed, non-empty category tokens across all records, sorted ascending.
pub fn derive_categories(records: &[PharmacyRecord]) -> Vec<String> {
    let categories: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.collected_items.as_deref())
        .flat_map(|items| items.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();

    categories.into_iter().map(str::to_string).collect()
}

pub fn max_selected_warning(max_selected: usize) -> String {
    format!("❗ 최대 {}개까지만 선택할 수 있어요", max_selected)
}

/// Apply the selection limit to the categories a user checked.
///
/// The kept categories follow `candidates` (display order) whatever order `raw`
/// arrives in. Entries that are not offered as candidates are dropped and repeats
/// collapse. Anything past `max_selected` is cut off and a warning is attached.
pub fn select_categories(candidates: &[String], raw: &[String], max_selected: usize) -> Selection {
    for choice in raw.iter().filter(|c| !candidates.contains(c)) {
        debug!("Ignoring unknown category {:?}", choice);
    }
    let mut categories: Vec<String> = candidates
        .iter()
        .filter(|candidate| raw.contains(candidate))
        .cloned()
        .collect();

    let warning = if categories.len() > max_selected {
        warn!(
            "Selection of {} categories exceeds limit of {}; truncating",
            categories.len(),
            max_selected
        );
        categories.truncate(max_selected);
        Some(max_selected_warning(max_selected))
    } else {
        None
    };

    Selection { categories, warning }
}

/// Records whose raw collected-items text contains any selected category as a
/// literal, case-sensitive substring. An empty selection matches nothing.
pub fn filter_records(records: &[PharmacyRecord], selected: &[String]) -> Vec<PharmacyRecord> {
    if selected.is_empty() {
        return Vec::new();
    }

    records
        .iter()
        .filter(|record| match record.collected_items.as_deref() {
            Some(items) => selected.iter().any(|category| items.contains(category.as_str())),
            None => false,
        })
        .cloned()
        .collect()
}

/// Result of one pass over the dataset for a raw selection.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub categories: Vec<String>,
    pub selection: Selection,
    pub matches: Vec<PharmacyRecord>,
}

pub fn evaluate(records: &[PharmacyRecord], raw: &[String], max_selected: usize) -> Outcome {
    let categories = derive_categories(records);
    let selection = select_categories(&categories, raw, max_selected);
    let matches = filter_records(records, &selection.categories);
    debug!(
        "Selected {} categories, {} pharmacies matched",
        selection.categories.len(),
        matches.len()
    );
    Outcome { categories, selection, matches }
}
