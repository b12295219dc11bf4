//! Known alternate response shapes and their field-name mapping tables.
//!
//! Different model runs emit the same record with different key names
//! (snake_case groups, flattened scores). Each schema lists those shapes as
//! [`ResponseVariant`]s. The first variant whose source keys appear in the
//! response is applied before merging, and its name is recorded on the
//! canonical record.

use serde_json::{Map, Value};

pub const CANONICAL_VARIANT: &str = "canonical";

/// Move the value at JSON pointer `from` to JSON pointer `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRename {
    pub from: &'static str,
    pub to: &'static str,
}

pub const fn rename(from: &'static str, to: &'static str) -> FieldRename {
    FieldRename { from, to }
}

/// A named alternate shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseVariant {
    pub name: &'static str,
    pub renames: &'static [FieldRename],
}

impl ResponseVariant {
    fn matches(&self, response: &Value) -> bool {
        self.renames
            .iter()
            .any(|r| response.pointer(r.from).is_some())
    }

    fn apply(&self, response: &mut Value) {
        for r in self.renames {
            if response.pointer(r.to).is_some() {
                continue;
            }
            if let Some(value) = take_pointer(response, r.from) {
                insert_pointer(response, r.to, value);
            }
        }
    }
}

/// Detect the response variant and rewrite it to canonical key names.
///
/// Non-object responses are treated as an empty object.
pub fn canonicalize(response: &Value, variants: &[ResponseVariant]) -> (&'static str, Value) {
    let mut canonical = match response {
        Value::Object(_) => response.clone(),
        _ => Value::Object(Map::new()),
    };

    match variants.iter().find(|v| v.matches(&canonical)) {
        Some(variant) => {
            variant.apply(&mut canonical);
            tracing::debug!(variant = variant.name, "Mapped alternate response shape");
            (variant.name, canonical)
        }
        None => (CANONICAL_VARIANT, canonical),
    }
}

fn split_pointer(pointer: &str) -> Option<(&str, &str)> {
    let idx = pointer.rfind('/')?;
    Some((&pointer[..idx], &pointer[idx + 1..]))
}

pub(crate) fn take_pointer(root: &mut Value, pointer: &str) -> Option<Value> {
    let (parent, key) = split_pointer(pointer)?;
    root.pointer_mut(parent)?.as_object_mut()?.remove(key)
}

pub(crate) fn insert_pointer(root: &mut Value, pointer: &str, value: Value) {
    let mut segments: Vec<&str> = pointer.split('/').skip(1).collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut node = root;
    for segment in segments {
        let Some(object) = node.as_object_mut() else {
            return;
        };
        let child = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = child;
    }

    if let Some(object) = node.as_object_mut() {
        object.insert(last.to_string(), value);
    }
}
