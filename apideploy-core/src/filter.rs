//! Selection of the values that may be sent to the service for an action.

use serde_json::{Map, Value};

use crate::{
    change::ActionKind,
    element::{ElemId, Entity, FieldAnnotations},
    path::{self, FieldPath},
};

/// Describes a top-level field to a caller-supplied ignore predicate.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    pub name: &'a str,
    pub elem_id: &'a ElemId,
}

/// Caller-supplied predicate: `true` drops the field from the request body.
pub type FieldPredicate = dyn Fn(&FieldRef<'_>) -> bool + Send + Sync;

fn is_deployable(annotations: Option<&FieldAnnotations>, action: ActionKind) -> bool {
    let Some(annotations) = annotations else {
        return true;
    };
    match action {
        ActionKind::Add => annotations.creatable != Some(false),
        ActionKind::Modify => annotations.updatable != Some(false),
        ActionKind::Remove => true,
    }
}

/// The entity's values that may be sent for `action`, in their original order.
///
/// Fields without annotations are kept.
pub fn filter_undeployable_values(entity: &Entity, action: ActionKind) -> Map<String, Value> {
    entity
        .value
        .iter()
        .filter(|(name, _)| is_deployable(entity.object_type.field(name), action))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Drop the `ignored` paths and every top-level field matching `predicate`.
pub fn remove_ignored_fields(
    values: &mut Map<String, Value>,
    elem_id: &ElemId,
    ignored: &[FieldPath],
    predicate: Option<&FieldPredicate>,
) {
    for path in ignored {
        path::remove(values, path);
    }
    if let Some(predicate) = predicate {
        values.retain(|name, _| !predicate(&FieldRef { name, elem_id }));
    }
}
