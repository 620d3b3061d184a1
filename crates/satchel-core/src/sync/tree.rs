//! Slash-path access into a JSON tree
//!
//! Objects are addressed by key, arrays by decimal index. Writing `null`
//! removes the node, and writing past the end of an array pads it with
//! `null`.

use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set the node at `path`, creating intermediate objects as needed
pub fn set(root: &mut Value, path: &str, value: Value) {
    if value.is_null() {
        remove(root, path);
        return;
    }
    let mut node = root;
    for key in segments(path) {
        node = child_or_insert(node, key);
    }
    *node = value;
}

/// Remove the node at `path`; returns what was there
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        return Some(std::mem::take(root));
    };
    let mut node = root;
    for key in parents {
        node = match node {
            Value::Object(map) => map.get_mut(*key)?,
            Value::Array(items) => items.get_mut(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::Object(map) => map.remove(*last),
        Value::Array(items) => {
            let i = last.parse::<usize>().ok()?;
            if i >= items.len() {
                return None;
            }
            // Trailing holes are trimmed, inner ones stay as null
            let removed = std::mem::take(&mut items[i]);
            while items.last().is_some_and(Value::is_null) {
                items.pop();
            }
            Some(removed)
        }
        _ => None,
    }
}

fn child_or_insert<'a>(node: &'a mut Value, key: &str) -> &'a mut Value {
    let index = key.parse::<usize>().ok();
    // A fresh node addressed by index becomes an array
    if index.is_some() && is_blank(node) {
        *node = Value::Array(Vec::new());
    }
    match (node.is_array(), index) {
        (true, Some(i)) => {
            if let Value::Array(items) = node {
                if i >= items.len() {
                    items.resize(i + 1, Value::Null);
                }
            }
        }
        (true, None) => {
            let items = match std::mem::take(node) {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            *node = Value::Object(array_to_map(items));
        }
        (false, _) => {
            if !node.is_object() {
                // Indexing null by key turns it into an object
                *node = Value::Null;
            }
        }
    }
    let child = match index {
        Some(i) if node.is_array() => &mut node[i],
        _ => &mut node[key],
    };
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    child
}

fn is_blank(node: &Value) -> bool {
    match node {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn array_to_map(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_null())
        .map(|(i, v)| (i.to_string(), v))
        .collect()
}

/// Whether two paths overlap (one is a prefix of the other)
pub fn overlaps(a: &str, b: &str) -> bool {
    let mut left = segments(a);
    let mut right = segments(b);
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x == y => continue,
            (Some(_), Some(_)) => return false,
            _ => return true,
        }
    }
}
