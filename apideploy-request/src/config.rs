//! Declarative endpoint configuration.
//!
//! The configuration is validated while it is deserialized: URL templates,
//! field paths and query parameters that cannot possibly work are rejected
//! when the configuration is loaded, not when a change is deployed.

use std::{collections::BTreeMap, path::Path};

use apideploy_client::HttpMethod;
use apideploy_core::{path::PathRoot, ActionKind, FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{error::ConfigError, url::UrlTemplate};

/// How to perform one action against the service for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEndpointDefinition")]
pub struct EndpointDefinition {
    pub url: UrlTemplate,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub url_params_to_fields: BTreeMap<String, FieldPath>,
    pub omit_request_body: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields_to_ignore: Vec<FieldPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_params: Option<BTreeMap<String, String>>,
    /// Send the values wrapped as `{ <deployAsField>: values }`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_as_field: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawEndpointDefinition {
    url: UrlTemplate,
    method: HttpMethod,
    #[serde(default)]
    url_params_to_fields: BTreeMap<String, FieldPath>,
    #[serde(default)]
    omit_request_body: bool,
    #[serde(default)]
    fields_to_ignore: Vec<FieldPath>,
    #[serde(default)]
    query_params: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    deploy_as_field: Option<String>,
}

impl TryFrom<RawEndpointDefinition> for EndpointDefinition {
    type Error = String;

    fn try_from(raw: RawEndpointDefinition) -> Result<Self, Self::Error> {
        if let Some(path) = raw
            .fields_to_ignore
            .iter()
            .find(|path| path.root() != PathRoot::Value)
        {
            return Err(format!(
                "fieldsToIgnore entry {} of {} does not name a field of the entity",
                path,
                raw.url.as_str()
            ));
        }
        let query_params = raw
            .query_params
            .map(|params| {
                params
                    .into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => Ok((k, s)),
                        Value::Number(n) => Ok((k, n.to_string())),
                        Value::Bool(b) => Ok((k, b.to_string())),
                        other => Err(format!(
                            "query parameter {} of {} must be a string, number or boolean, got {}",
                            k,
                            raw.url.as_str(),
                            other
                        )),
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()
            })
            .transpose()?;
        for name in raw.url_params_to_fields.keys() {
            if !raw.url.params().any(|p| p == name) {
                warn!(
                    "urlParamsToFields entry {} does not occur in URL {}; it is ignored",
                    name,
                    raw.url.as_str()
                );
            }
        }
        Ok(EndpointDefinition {
            url: raw.url,
            method: raw.method,
            url_params_to_fields: raw.url_params_to_fields,
            omit_request_body: raw.omit_request_body,
            fields_to_ignore: raw.fields_to_ignore,
            query_params,
            deploy_as_field: raw.deploy_as_field,
        })
    }
}

/// The endpoint definitions of one entity type, per action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentRequestsByAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<EndpointDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modify: Option<EndpointDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<EndpointDefinition>,
}

impl DeploymentRequestsByAction {
    pub fn get(&self, action: ActionKind) -> Option<&EndpointDefinition> {
        match action {
            ActionKind::Add => self.add.as_ref(),
            ActionKind::Modify => self.modify.as_ref(),
            ActionKind::Remove => self.remove.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDeployConfig {
    #[serde(default)]
    pub deploy_requests: DeploymentRequestsByAction,
}

/// Deploy configuration for all entity types of an adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDeployConfig>,
}

impl DeployConfig {
    pub fn from_json_str(json: &str) -> Result<DeployConfig, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<DeployConfig, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn requests_for(&self, type_name: &str) -> Option<&DeploymentRequestsByAction> {
        self.types.get(type_name).map(|t| &t.deploy_requests)
    }
}
