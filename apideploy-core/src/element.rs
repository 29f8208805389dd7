use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The identity of an entity: `adapter.typeName.instance.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElemId {
    pub adapter: String,
    pub type_name: String,
    pub name: String,
}

const INSTANCE_SEGMENT: &str = "instance";

impl ElemId {
    pub fn new(adapter: &str, type_name: &str, name: &str) -> Self {
        ElemId {
            adapter: adapter.to_string(),
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl Display for ElemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.adapter, self.type_name, INSTANCE_SEGMENT, self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid element id {0:?}: expected adapter.typeName.instance.name")]
pub struct ElemIdError(String);

impl FromStr for ElemId {
    type Err = ElemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The instance name may itself contain dots, the first three segments may not.
        let mut parts = s.splitn(4, '.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(adapter), Some(type_name), Some(INSTANCE_SEGMENT), Some(name))
                if !adapter.is_empty() && !type_name.is_empty() && !name.is_empty() =>
            {
                Ok(ElemId::new(adapter, type_name, name))
            }
            _ => Err(ElemIdError(s.to_string())),
        }
    }
}

impl TryFrom<String> for ElemId {
    type Error = ElemIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ElemId> for String {
    fn from(value: ElemId) -> Self {
        value.to_string()
    }
}

/// Per-field metadata that decides whether a value may be sent to the service.
///
/// `None` means "not annotated", which is treated as permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updatable: Option<bool>,
    /// Hidden values are not part of the compared state, but they are kept in
    /// the value tree so that they can be used to address the entity.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// The type of an entity, as far as deployment is concerned: its annotated fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldAnnotations>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&FieldAnnotations> {
        self.fields.get(name)
    }
}

/// A snapshot of an ancestor's value tree, addressed by `_parent.<index>` paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub elem_id: ElemId,
    #[serde(default)]
    pub value: Map<String, Value>,
}

/// A business object instance as seen by the deploy engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub elem_id: ElemId,
    #[serde(rename = "type", default)]
    pub object_type: ObjectType,
    #[serde(default)]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ParentRef>,
}

impl Entity {
    pub fn new(elem_id: ElemId, object_type: ObjectType, value: Map<String, Value>) -> Self {
        Entity {
            elem_id,
            object_type,
            value,
            parents: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: &Entity) -> Self {
        self.parents.push(ParentRef {
            elem_id: parent.elem_id.clone(),
            value: parent.value.clone(),
        });
        self
    }

    pub fn type_name(&self) -> &str {
        &self.elem_id.type_name
    }

    /// The value tree without hidden fields, i.e. what a fetch would compare.
    pub fn visible_value(&self) -> Map<String, Value> {
        self.value
            .iter()
            .filter(|(name, _)| {
                !self
                    .object_type
                    .field(name)
                    .is_some_and(|annotations| annotations.hidden)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
