//! Sending changes to the service, one at a time or as a batch.

use std::{collections::VecDeque, sync::Arc};

use apideploy_client::HttpClient;
use apideploy_core::{ActionKind, Change, Entity, FieldPredicate};
use apideploy_request::{build_request, DeployConfig, DeploymentRequestsByAction};
use async_trait::async_trait;
use futures_util::StreamExt as _;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument as _};

use crate::{
    error::{ChangeError, DeployError},
    interrupt::InterruptState,
    order::order_by_dependencies,
};

/// Deploy a single change and return the response body.
///
/// No request is sent when the change's action has no endpoint or its URL
/// cannot be built. After a successful addition, the response is merged into
/// the `after` value tree, so that service-assigned fields such as `id` are
/// available to later requests.
pub async fn deploy_change(
    change: &mut Change,
    client: &dyn HttpClient,
    endpoint_details: &DeploymentRequestsByAction,
    fields_to_ignore: Option<&FieldPredicate>,
) -> Result<Value, DeployError> {
    let span = info_span!(
        "deploy change",
        elem_id = %change.elem_id(),
        action = %change.action()
    );
    send_change(change, client, endpoint_details, fields_to_ignore)
        .instrument(span)
        .await
}

async fn send_change(
    change: &mut Change,
    client: &dyn HttpClient,
    endpoint_details: &DeploymentRequestsByAction,
    fields_to_ignore: Option<&FieldPredicate>,
) -> Result<Value, DeployError> {
    let request = build_request(change, endpoint_details, fields_to_ignore)?;
    debug!("sending {} {}", request.method, request.url);
    let (method, args) = request.into_parts();
    let url = args.url.clone();
    let response = client.send(method, args).await?;
    if !response.is_success() {
        return Err(DeployError::UnsuccessfulStatus {
            method,
            url,
            status: response.status,
            data: response.data,
        });
    }
    if change.action() == ActionKind::Add {
        if let Some(after) = change.after_mut() {
            merge_response(after, &response.data);
        }
    }
    Ok(response.data)
}

/// Merge an object response into `entity`. `null` in the response never
/// removes a value the entity already has.
fn merge_response(entity: &mut Entity, data: &Value) {
    if !data.is_object() {
        debug!(
            "not merging non-object response into {}: {}",
            entity.elem_id, data
        );
        return;
    }
    let mut patch = data.clone();
    strip_nulls(&mut patch);
    let mut merged = Value::Object(std::mem::take(&mut entity.value));
    json_patch::merge(&mut merged, &patch);
    if let Value::Object(value) = merged {
        entity.value = value;
    }
}

fn strip_nulls(value: &mut Value) {
    if let Value::Object(map) = value {
        map.retain(|_, v| !v.is_null());
        map.values_mut().for_each(strip_nulls);
    }
}

/// Deploys one change. Implementations decide which endpoints apply to it.
#[async_trait]
pub trait ChangeDeployer: Send + Sync {
    async fn deploy(&self, change: &mut Change) -> Result<(), DeployError>;
}

/// Deploys changes using the endpoints configured for their type.
pub struct StandardDeployer {
    client: Arc<dyn HttpClient>,
    config: Arc<DeployConfig>,
    fields_to_ignore: Option<Box<FieldPredicate>>,
}

impl StandardDeployer {
    pub fn new(client: Arc<dyn HttpClient>, config: Arc<DeployConfig>) -> Self {
        StandardDeployer {
            client,
            config,
            fields_to_ignore: None,
        }
    }

    /// Also leave out every top-level field matched by `predicate`.
    pub fn with_fields_to_ignore(mut self, predicate: Box<FieldPredicate>) -> Self {
        self.fields_to_ignore = Some(predicate);
        self
    }
}

#[async_trait]
impl ChangeDeployer for StandardDeployer {
    async fn deploy(&self, change: &mut Change) -> Result<(), DeployError> {
        let unconfigured = DeploymentRequestsByAction::default();
        let requests = self
            .config
            .requests_for(change.data().type_name())
            .unwrap_or(&unconfigured);
        deploy_change(
            change,
            self.client.as_ref(),
            requests,
            self.fields_to_ignore.as_deref(),
        )
        .await?;
        Ok(())
    }
}

/// The outcome of a batch. Every input change is in exactly one of the lists.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub applied_changes: Vec<Change>,
    pub errors: Vec<ChangeError>,
}

impl DeployResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, change: Change, outcome: Result<(), DeployError>) {
        match outcome {
            Ok(()) => self.applied_changes.push(change),
            Err(e) => {
                warn!("failed to deploy {}: {}", change.elem_id(), e);
                self.errors
                    .push(ChangeError::new(change.elem_id().clone(), &e));
            }
        }
    }
}

/// Deploy `changes` one after the other, parents before children.
///
/// A failing change does not stop the batch.
pub async fn deploy_changes(changes: Vec<Change>, deployer: &dyn ChangeDeployer) -> DeployResult {
    deploy_changes_until(changes, deployer, &InterruptState::new()).await
}

/// Like [`deploy_changes`], but stop sending once `interrupt` is set.
///
/// Changes that were not sent are reported as interrupted. Nothing that was
/// already applied is rolled back.
pub async fn deploy_changes_until(
    changes: Vec<Change>,
    deployer: &dyn ChangeDeployer,
    interrupt: &InterruptState,
) -> DeployResult {
    let total = changes.len();
    let mut pending: VecDeque<Change> = order_by_dependencies(changes).into();
    let mut result = DeployResult::default();
    while let Some(mut change) = pending.pop_front() {
        if let Err(e) = interrupt.check_interrupted() {
            result.record(change, Err(e.into()));
            continue;
        }
        let outcome = deployer.deploy(&mut change).await;
        if outcome.is_ok() {
            if let Some(deployed) = change.after() {
                refresh_parent_snapshots(pending.iter_mut(), deployed);
            }
        }
        result.record(change, outcome);
    }
    info!(
        "deployed {} of {} changes",
        result.applied_changes.len(),
        total
    );
    result
}

/// Replace the snapshots of `deployed` held by later changes with its current value.
fn refresh_parent_snapshots<'a>(
    pending: impl Iterator<Item = &'a mut Change>,
    deployed: &Entity,
) {
    for change in pending {
        for parent in change
            .data_mut()
            .parents
            .iter_mut()
            .filter(|p| p.elem_id == deployed.elem_id)
        {
            parent.value = deployed.value.clone();
        }
    }
}

/// Deploy independent changes with at most `limit` requests in flight.
///
/// The caller guarantees that no change depends on another one in the batch:
/// changes are not reordered and parent snapshots are not refreshed. Results
/// are reported in input order. Once `interrupt` is set, changes that have not
/// been sent yet are reported as interrupted.
pub async fn deploy_changes_concurrently(
    changes: Vec<Change>,
    deployer: &dyn ChangeDeployer,
    limit: usize,
    interrupt: &InterruptState,
) -> DeployResult {
    let total = changes.len();
    let outcomes: Vec<(Change, Result<(), DeployError>)> =
        futures_util::stream::iter(changes.into_iter().map(|mut change| async move {
            let outcome = match interrupt.check_interrupted() {
                Ok(()) => deployer.deploy(&mut change).await,
                Err(e) => Err(e.into()),
            };
            (change, outcome)
        }))
        .buffered(limit.max(1))
        .collect()
        .await;
    let mut result = DeployResult::default();
    for (change, outcome) in outcomes {
        result.record(change, outcome);
    }
    info!(
        "deployed {} of {} changes",
        result.applied_changes.len(),
        total
    );
    result
}
