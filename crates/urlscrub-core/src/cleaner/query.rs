//! Final query/fragment filter run after all provider rules.

use std::collections::HashSet;

/// Rebuilds an `&`-separated field list.
///
/// Segments without `=` are dropped. With `strip_empty`, fields with an empty
/// value are dropped; with `strip_duplicates`, later fields reusing an earlier
/// name are dropped. Survivors keep their original order and spelling.
pub fn filter_query(query: &str, strip_empty: bool, strip_duplicates: bool) -> String {
    let mut seen = HashSet::new();
    query
        .split('&')
        .filter(|segment| {
            let Some((name, value)) = segment.split_once('=') else {
                return false;
            };
            if strip_empty && value.is_empty() {
                return false;
            }
            !strip_duplicates || seen.insert(name)
        })
        .collect::<Vec<_>>()
        .join("&")
}
