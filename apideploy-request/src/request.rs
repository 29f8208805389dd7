use std::collections::BTreeMap;

use apideploy_client::{HttpMethod, RequestArgs};
use apideploy_core::{
    filter::{filter_undeployable_values, remove_ignored_fields},
    Change, FieldPredicate,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    config::{DeploymentRequestsByAction, EndpointDefinition},
    error::BuildError,
    url::build_url,
};

/// A fully shaped request, ready to be handed to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub data: Option<Value>,
    pub query_params: Option<BTreeMap<String, String>>,
}

impl HttpRequest {
    pub fn into_parts(self) -> (HttpMethod, RequestArgs) {
        (
            self.method,
            RequestArgs {
                url: self.url,
                data: self.data,
                query_params: self.query_params,
            },
        )
    }
}

/// Select the endpoint for the change's action and build its request.
///
/// Fails without side effects when the action has no endpoint.
pub fn build_request(
    change: &Change,
    requests: &DeploymentRequestsByAction,
    fields_to_ignore: Option<&FieldPredicate>,
) -> Result<HttpRequest, BuildError> {
    let endpoint = requests
        .get(change.action())
        .ok_or_else(|| BuildError::MissingEndpoint {
            action: change.action(),
            type_name: change.data().type_name().to_string(),
        })?;
    build_request_for(change, endpoint, fields_to_ignore)
}

/// Build the request for `change` against a known endpoint.
///
/// Fields used in the URL stay in the body unless they are ignored.
pub fn build_request_for(
    change: &Change,
    endpoint: &EndpointDefinition,
    fields_to_ignore: Option<&FieldPredicate>,
) -> Result<HttpRequest, BuildError> {
    let entity = change.data();
    let mut values = filter_undeployable_values(entity, change.action());
    remove_ignored_fields(
        &mut values,
        &entity.elem_id,
        &endpoint.fields_to_ignore,
        fields_to_ignore,
    );

    let built = build_url(&endpoint.url, &endpoint.url_params_to_fields, entity)?;
    trace!(
        "{} uses fields {:?} in URL {}",
        entity.elem_id,
        built.consumed_fields,
        built.url
    );

    let data = if endpoint.omit_request_body {
        None
    } else {
        Some(match &endpoint.deploy_as_field {
            Some(field) => {
                let mut wrapper = Map::new();
                wrapper.insert(field.clone(), Value::Object(values));
                Value::Object(wrapper)
            }
            None => Value::Object(values),
        })
    };

    Ok(HttpRequest {
        method: endpoint.method,
        url: built.url,
        data,
        query_params: endpoint.query_params.clone(),
    })
}
