//! Dotted path resolution over the value tree.

use super::value::{Map, Value};

/// Resolves `path` against `root`.
///
/// With `dotted` set, the path is split on `sep` and walked one segment per
/// level: mapping nodes are indexed by key, sequence nodes by a base-10
/// index. Without it, the whole path is a single literal key of the root
/// mapping, and a path containing `sep` never resolves. An empty path never
/// resolves. An explicit null is returned as
/// `Some(&Value::Null)`, distinct from a miss.
pub fn resolve<'a>(root: &'a Value, path: &str, dotted: bool, sep: char) -> Option<&'a Value> {
    match root {
        Value::Mapping(map) => lookup(map, path, dotted, sep),
        _ if path.is_empty() || !dotted => None,
        _ => path.split(sep).try_fold(root, step),
    }
}

/// [`resolve`] for a root that is known to be a mapping.
pub(crate) fn lookup<'a>(root: &'a Map, path: &str, dotted: bool, sep: char) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    if !dotted {
        if path.contains(sep) {
            return None;
        }
        return root.get(path);
    }

    let mut segments = path.split(sep);
    let first = root.get(segments.next()?)?;
    segments.try_fold(first, step)
}

/// Descends one level from `node` using `segment`.
fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Mapping(map) => map.get(segment),
        Value::Sequence(items) => items.get(parse_index(segment)?),
        _ => None,
    }
}

/// Parses a sequence index: ASCII digits only, no sign.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Splits a path for writing. Every segment must be non-empty.
pub(crate) fn segments(path: &str, sep: char) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    let parts: Vec<&str> = path.split(sep).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize;
    use serde_json::json;

    fn tree() -> Value {
        normalize(&json!({
            "age": 123,
            "name": "app",
            "nothing": null,
            "map1": {"key": "val1", "key2": "val2"},
            "arr1": ["val", "val1", "val2"],
            "nested": {"list": [{"id": 7}, [1, 2]]}
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_path_is_not_found() {
        let root = tree();
        assert_eq!(resolve(&root, "", true, '.'), None);
        assert_eq!(resolve(&root, "", false, '.'), None);
    }

    #[test]
    fn test_mapping_and_sequence_walk() {
        let root = tree();
        assert_eq!(resolve(&root, "age", true, '.'), Some(&Value::Int(123)));
        assert_eq!(
            resolve(&root, "map1.key", true, '.'),
            Some(&Value::String("val1".into()))
        );
        assert_eq!(
            resolve(&root, "arr1.1", true, '.'),
            Some(&Value::String("val1".into()))
        );
        assert_eq!(resolve(&root, "nested.list.0.id", true, '.'), Some(&Value::Int(7)));
        assert_eq!(resolve(&root, "nested.list.1.1", true, '.'), Some(&Value::Int(2)));
    }

    #[test]
    fn test_explicit_null_is_found() {
        let root = tree();
        assert_eq!(resolve(&root, "nothing", true, '.'), Some(&Value::Null));
        assert_eq!(resolve(&root, "nothing.sub", true, '.'), None);
    }

    #[test]
    fn test_misses() {
        let root = tree();
        for path in [
            "notExist",
            "name.sub",
            "map1.notExist",
            "notExist.sub",
            "arr1.100",
            "arr1.notExist",
            "arr1.-1",
            "arr1.+1",
            "arr1.",
            "map1.",
        ] {
            assert_eq!(resolve(&root, path, true, '.'), None, "path {path}");
        }
    }

    #[test]
    fn test_literal_lookup_does_not_split() {
        let root = tree();
        assert_eq!(resolve(&root, "map1.key", false, '.'), None);
        assert_eq!(resolve(&root, "arr1.1", false, '.'), None);
        assert_eq!(resolve(&root, "name", false, '.'), Some(&Value::String("app".into())));

        let dotted_key = normalize(&json!({"a.b": 1})).unwrap();
        assert_eq!(resolve(&dotted_key, "a.b", false, '.'), None);
        assert_eq!(resolve(&dotted_key, "a.b", true, '.'), None);
        assert_eq!(resolve(&dotted_key, "a.b", false, ':'), Some(&Value::Int(1)));
    }

    #[test]
    fn test_custom_separator() {
        let root = tree();
        assert_eq!(
            resolve(&root, "map1:key", true, ':'),
            Some(&Value::String("val1".into()))
        );
        assert_eq!(resolve(&root, "map1.key", true, ':'), None);
    }

    #[test]
    fn test_segments_reject_empty_parts() {
        assert_eq!(segments("a.b", '.'), Some(vec!["a", "b"]));
        assert_eq!(segments("", '.'), None);
        assert_eq!(segments("a..b", '.'), None);
        assert_eq!(segments(".a", '.'), None);
    }
}
