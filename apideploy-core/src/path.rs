//! Dotted field paths, such as `obj.id` or `_parent.0.id`, and their
//! resolution against an entity's value tree.
//!
//! Paths are parsed once, when the configuration is loaded, so that a
//! malformed path is a configuration error rather than a deploy-time surprise.
//! Resolution itself never fails: anything that cannot be found is `None`, and
//! the caller decides whether that is fatal.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::element::Entity;

/// Reserved first segment that addresses the ancestor context stack.
pub const PARENT_SEGMENT: &str = "_parent";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("field path is empty")]
    Empty,
    #[error("field path {0:?} contains an empty segment")]
    EmptySegment(String),
    #[error("field path {0:?} must continue with a numeric ancestor index after `_parent`")]
    MissingParentIndex(String),
}

/// Where resolution of a [`FieldPath`] starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathRoot {
    /// The entity's own value tree.
    Value,
    /// The value tree of the ancestor at this index.
    Parent(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    root: PathRoot,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<FieldPath, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        let (root, rest) = if parts[0] == PARENT_SEGMENT {
            let index = parts
                .get(1)
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| PathError::MissingParentIndex(path.to_string()))?;
            (PathRoot::Parent(index), &parts[2..])
        } else {
            (PathRoot::Value, &parts[..])
        };
        Ok(FieldPath {
            root,
            segments: rest.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// A path naming a single top-level field.
    pub fn field(name: &str) -> FieldPath {
        FieldPath {
            root: PathRoot::Value,
            segments: vec![name.to_string()],
        }
    }

    pub fn root(&self) -> PathRoot {
        self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The entity field this path reads from, if it reads from the entity itself.
    pub fn top_level_field(&self) -> Option<&str> {
        match self.root {
            PathRoot::Value => self.segments.first().map(|s| s.as_str()),
            PathRoot::Parent(_) => None,
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let PathRoot::Parent(index) = self.root {
            parts.push(PARENT_SEGMENT.to_string());
            parts.push(index.to_string());
        }
        parts.extend(self.segments.iter().cloned());
        f.write_str(&parts.join("."))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldPath::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

/// The data a path is resolved against: an entity's value and its ancestors.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    value: &'a Map<String, Value>,
    ancestors: &'a [crate::element::ParentRef],
}

impl<'a> Scope<'a> {
    pub fn of(entity: &'a Entity) -> Self {
        Scope {
            value: &entity.value,
            ancestors: &entity.parents,
        }
    }

    pub fn value(&self) -> &'a Map<String, Value> {
        self.value
    }
}

/// Resolve `path` in `scope`.
///
/// Missing keys, out of range indices and descending into scalars all yield
/// `None`.
pub fn resolve<'a>(scope: &Scope<'a>, path: &FieldPath) -> Option<&'a Value> {
    let start = match path.root {
        PathRoot::Value => scope.value,
        PathRoot::Parent(index) => &scope.ancestors.get(index)?.value,
    };
    let Some((first, rest)) = path.segments.split_first() else {
        return None;
    };
    rest.iter()
        .try_fold(start.get(first)?, |current, segment| step(current, segment))
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Remove the value at `path` from `value`, returning it.
///
/// Only paths rooted in the value itself can be removed; ancestors are read-only.
pub fn remove(value: &mut Map<String, Value>, path: &FieldPath) -> Option<Value> {
    if path.root != PathRoot::Value {
        return None;
    }
    let (last, init) = path.segments.split_last()?;
    let Some((first, middle)) = init.split_first() else {
        return value.shift_remove(last);
    };
    let mut current = value.get_mut(first)?;
    for segment in middle {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.shift_remove(last),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElemId, ObjectType, ParentRef};
    use serde_json::json;

    fn entity(value: Value, parents: Vec<Value>) -> Entity {
        let mut entity = Entity::new(
            ElemId::new("adapter", "test", "inst"),
            ObjectType::default(),
            value.as_object().unwrap().clone(),
        );
        entity.parents = parents
            .into_iter()
            .enumerate()
            .map(|(i, v)| ParentRef {
                elem_id: ElemId::new("adapter", "parent", &i.to_string()),
                value: v.as_object().unwrap().clone(),
            })
            .collect();
        entity
    }

    fn resolve_str<'a>(entity: &'a Entity, path: &str) -> Option<&'a Value> {
        resolve(&Scope::of(entity), &FieldPath::parse(path).unwrap())
    }

    #[test]
    fn test_parse() {
        let p = FieldPath::parse("obj.id").unwrap();
        assert_eq!(p.root(), PathRoot::Value);
        assert_eq!(p.segments(), &["obj", "id"]);
        assert_eq!(p.top_level_field(), Some("obj"));

        let p = FieldPath::parse("_parent.1.id").unwrap();
        assert_eq!(p.root(), PathRoot::Parent(1));
        assert_eq!(p.segments(), &["id"]);
        assert_eq!(p.top_level_field(), None);
        assert_eq!(p.to_string(), "_parent.1.id");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            FieldPath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPath::parse("_parent.id"),
            Err(PathError::MissingParentIndex(_))
        ));
        assert!(matches!(
            FieldPath::parse("_parent"),
            Err(PathError::MissingParentIndex(_))
        ));
    }

    #[test]
    fn test_resolve_nested() {
        let e = entity(json!({ "obj": { "id": 1, "tags": ["a", "b"] } }), vec![]);
        assert_eq!(resolve_str(&e, "obj.id"), Some(&json!(1)));
        assert_eq!(resolve_str(&e, "obj.tags.1"), Some(&json!("b")));
        assert_eq!(resolve_str(&e, "obj.tags.2"), None);
        assert_eq!(resolve_str(&e, "obj.tags.x"), None);
        assert_eq!(resolve_str(&e, "obj.id.deeper"), None);
        assert_eq!(resolve_str(&e, "missing"), None);
    }

    #[test]
    fn test_resolve_parent() {
        let e = entity(
            json!({ "id": "child" }),
            vec![json!({ "id": 10 }), json!({ "key": "PROJ" })],
        );
        assert_eq!(resolve_str(&e, "_parent.0.id"), Some(&json!(10)));
        assert_eq!(resolve_str(&e, "_parent.1.key"), Some(&json!("PROJ")));
        assert_eq!(resolve_str(&e, "_parent.2.id"), None);
        assert_eq!(resolve_str(&e, "_parent.0"), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let e = entity(json!({ "a": { "b": [1, 2, 3] } }), vec![json!({ "id": 5 })]);
        for path in ["a.b.0", "_parent.0.id", "nope"] {
            assert_eq!(resolve_str(&e, path), resolve_str(&e, path));
        }
        assert_eq!(e.value["a"], json!({ "b": [1, 2, 3] }));
    }

    #[test]
    fn test_remove() {
        let mut value = json!({
            "title": "t",
            "position": { "column": 1, "row": 2 },
            "list": [1, 2, 3],
        })
        .as_object()
        .unwrap()
        .clone();
        assert_eq!(
            remove(&mut value, &FieldPath::parse("position.column").unwrap()),
            Some(json!(1))
        );
        assert_eq!(
            remove(&mut value, &FieldPath::parse("list.1").unwrap()),
            Some(json!(2))
        );
        assert_eq!(remove(&mut value, &FieldPath::field("title")), Some(json!("t")));
        assert_eq!(remove(&mut value, &FieldPath::field("title")), None);
        assert_eq!(
            Value::Object(value),
            json!({ "position": { "row": 2 }, "list": [1, 3] })
        );
    }
}
