//! Growth-only schema merge.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::SchemaField;

/// Consolidate two field lists into one.
///
/// Fields of `a` are taken first. A field of `b` is added when its name is
/// new; when both sides hold a RECORD of the same name their children are
/// consolidated recursively. Any other name clash keeps the field already
/// present. The result is sorted by name at every level and neither input is
/// modified.
pub fn consolidate_fields(a: &[SchemaField], b: &[SchemaField]) -> Vec<SchemaField> {
    let mut all: BTreeMap<&str, SchemaField> = a
        .iter()
        .map(|field| (field.name.as_str(), sorted(field)))
        .collect();

    for field in b {
        match all.entry(field.name.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(sorted(field));
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if existing.is_record() && field.is_record() {
                    existing.fields = consolidate_fields(&existing.fields, &field.fields);
                }
            }
        }
    }

    all.into_values().collect()
}

// Copy of a field with its children sorted by name, so fields that never
// clash still come out ordered.
fn sorted(field: &SchemaField) -> SchemaField {
    let mut copy = field.clone();
    if copy.is_record() {
        copy.fields = consolidate_fields(&field.fields, &[]);
    }
    copy
}
