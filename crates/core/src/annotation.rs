use std::sync::LazyLock;

use regex::Regex;

use crate::model::jaeger::KeyValue;

// One optional whitespace char, then the key run, then `=`.
static FIELD_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?\S+=").expect("field marker pattern is valid"));

/// Splits a packed annotation value such as `retry attempt=2 peer=redis:6379`
/// into ordered key/value fields.
///
/// Every `key=` marker starts a new field that runs until the next marker or
/// the end of the string. Text before the first marker is dropped, and a
/// value without any marker yields no fields.
pub fn parse_fields(value: &str) -> Vec<KeyValue> {
    let starts: Vec<usize> = FIELD_MARKER.find_iter(value).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(value.len());
            let segment = strip_leading_space(&value[start..end]);
            let (key, rest) = segment.split_once('=')?;
            Some(KeyValue {
                key: key.to_string(),
                value: rest.to_string(),
            })
        })
        .collect()
}

fn strip_leading_space(segment: &str) -> &str {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => segment,
    }
}
