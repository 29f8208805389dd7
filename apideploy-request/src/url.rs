//! URL templates with `{name}` placeholders, filled from entity fields.

use std::collections::{BTreeMap, BTreeSet};

use apideploy_core::{
    path::{self, Scope},
    Entity, FieldPath,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{BuildError, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<UrlTemplate, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(TemplateError::Unclosed(template.to_string()))
                            }
                            Some(c) => name.push(c),
                        }
                    }
                    if name.trim().is_empty() {
                        return Err(TemplateError::EmptyParam(template.to_string()));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Param(name));
                }
                '}' => return Err(TemplateError::Unopened(template.to_string())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(UrlTemplate {
            raw: template.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The placeholder names, in order of appearance (repeats included).
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Param(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }
}

impl TryFrom<String> for UrlTemplate {
    type Error = TemplateError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        UrlTemplate::parse(&value)
    }
}

impl From<UrlTemplate> for String {
    fn from(value: UrlTemplate) -> Self {
        value.raw
    }
}

/// A URL with its placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltUrl {
    pub url: String,
    /// Top-level entity fields that supplied a URL parameter.
    pub consumed_fields: BTreeSet<String>,
}

/// Fill in `template` from `entity`.
///
/// A placeholder is resolved from its `params` entry if there is one, and
/// otherwise from the top-level entity field of the same name. When both exist
/// and disagree, the mapping wins and the ambiguity is logged.
pub fn build_url(
    template: &UrlTemplate,
    params: &BTreeMap<String, FieldPath>,
    entity: &Entity,
) -> Result<BuiltUrl, BuildError> {
    let scope = Scope::of(entity);
    let mut url = String::new();
    let mut consumed_fields = BTreeSet::new();
    for part in &template.parts {
        let name = match part {
            Part::Literal(s) => {
                url.push_str(s);
                continue;
            }
            Part::Param(name) => name,
        };
        let same_named = entity.value.get(name.as_str());
        let (path, value) = match params.get(name) {
            Some(path) => {
                let value = path::resolve(&scope, path);
                if let (Some(mapped), Some(field)) = (value, same_named) {
                    if path.top_level_field() != Some(name.as_str()) && mapped != field {
                        warn!(
                            "URL parameter {} of {} is mapped to {} ({}) but {} also has a field {} ({}); using the mapping",
                            name, template.as_str(), path, mapped, entity.elem_id, name, field
                        );
                    }
                }
                (path.clone(), value)
            }
            None => match same_named {
                Some(value) => (FieldPath::field(name), Some(value)),
                None => {
                    return Err(BuildError::UnmappedUrlParam {
                        param: name.clone(),
                        url: template.as_str().to_string(),
                        elem_id: entity.elem_id.clone(),
                    })
                }
            },
        };
        let rendered = render_param(value).map_err(|unresolved| {
            if unresolved {
                BuildError::UnresolvedUrlParam {
                    param: name.clone(),
                    path: path.clone(),
                    elem_id: entity.elem_id.clone(),
                }
            } else {
                BuildError::NonScalarUrlParam {
                    param: name.clone(),
                    path: path.clone(),
                    elem_id: entity.elem_id.clone(),
                }
            }
        })?;
        url.push_str(&urlencoding::encode(&rendered));
        if let Some(field) = path.top_level_field() {
            consumed_fields.insert(field.to_string());
        }
    }
    Ok(BuiltUrl {
        url,
        consumed_fields,
    })
}

/// `Err(true)` for a missing value, `Err(false)` for one that has no URL form.
fn render_param(value: Option<&Value>) -> Result<String, bool> {
    match value {
        None | Some(Value::Null) => Err(true),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apideploy_core::{ElemId, ObjectType, ParentRef};
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        Entity::new(
            ElemId::new("jira", "DashboardGadget", "g1"),
            ObjectType::default(),
            value.as_object().unwrap().clone(),
        )
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, FieldPath> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldPath::parse(v).unwrap()))
            .collect()
    }

    #[test]
    fn test_parse() {
        let t =
            UrlTemplate::parse("/rest/api/3/dashboard/{dashboardId}/gadget/{gadgetId}").unwrap();
        assert_eq!(t.params().collect::<Vec<_>>(), vec!["dashboardId", "gadgetId"]);
        assert_eq!(UrlTemplate::parse("/plain").unwrap().params().count(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            UrlTemplate::parse("/a/{id"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            UrlTemplate::parse("/a/{x{y}}"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            UrlTemplate::parse("/a/id}"),
            Err(TemplateError::Unopened(_))
        ));
        assert!(matches!(
            UrlTemplate::parse("/a/{}"),
            Err(TemplateError::EmptyParam(_))
        ));
    }

    #[test]
    fn test_mapped_param() {
        let e = entity(json!({ "obj": { "id": 1 } }));
        let t = UrlTemplate::parse("/test/endpoint/{instanceId}").unwrap();
        let built = build_url(&t, &params(&[("instanceId", "obj.id")]), &e).unwrap();
        assert_eq!(built.url, "/test/endpoint/1");
        assert_eq!(
            built.consumed_fields.into_iter().collect::<Vec<_>>(),
            vec!["obj".to_string()]
        );
    }

    #[test]
    fn test_parent_param_and_fallback() {
        let mut e = entity(json!({ "id": "g 1" }));
        e.parents.push(ParentRef {
            elem_id: ElemId::new("jira", "Dashboard", "d1"),
            value: json!({ "id": 10000 }).as_object().unwrap().clone(),
        });
        let t = UrlTemplate::parse("/rest/api/3/dashboard/{dashboardId}/gadget/{id}").unwrap();
        let built = build_url(&t, &params(&[("dashboardId", "_parent.0.id")]), &e).unwrap();
        assert_eq!(built.url, "/rest/api/3/dashboard/10000/gadget/g%201");
        assert_eq!(
            built.consumed_fields.into_iter().collect::<Vec<_>>(),
            vec!["id".to_string()]
        );
    }

    #[test]
    fn test_mapping_wins_over_same_named_field() {
        let e = entity(json!({ "id": "own", "other": "mapped" }));
        let t = UrlTemplate::parse("/x/{id}").unwrap();
        let built = build_url(&t, &params(&[("id", "other")]), &e).unwrap();
        assert_eq!(built.url, "/x/mapped");
    }

    #[test]
    fn test_unmapped_param() {
        let e = entity(json!({ "name": "n" }));
        let t = UrlTemplate::parse("/x/{fieldId}").unwrap();
        let err = build_url(&t, &BTreeMap::new(), &e).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("fieldId"));
    }

    #[test]
    fn test_unresolved_param() {
        let e = entity(json!({ "obj": {} }));
        let t = UrlTemplate::parse("/x/{instanceId}").unwrap();
        let err = build_url(&t, &params(&[("instanceId", "obj.id")]), &e).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnresolvedUrlParam {
                param: "instanceId".to_string(),
                path: FieldPath::parse("obj.id").unwrap(),
                elem_id: e.elem_id.clone(),
            }
        );
        assert!(err.to_string().contains("obj.id"));

        let null_fallback = entity(json!({ "id": null }));
        let err = build_url(
            &UrlTemplate::parse("/x/{id}").unwrap(),
            &BTreeMap::new(),
            &null_fallback,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedUrlParam { .. }));
    }

    #[test]
    fn test_non_scalar_param() {
        let e = entity(json!({ "obj": { "id": [1] } }));
        let t = UrlTemplate::parse("/x/{instanceId}").unwrap();
        let err = build_url(&t, &params(&[("instanceId", "obj.id")]), &e).unwrap_err();
        assert!(matches!(err, BuildError::NonScalarUrlParam { .. }));
        assert!(!err.is_configuration());
    }
}
