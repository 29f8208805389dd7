use apideploy_client::ClientError;
use apideploy_core::ElemId;
use apideploy_request::BuildError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::interrupt::InterruptedError;

/// Why a single change could not be deployed.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Transport(#[from] ClientError),
    /// The client returned a response, but not a successful one.
    #[error("{method} {url} returned status {status}: {data}")]
    UnsuccessfulStatus {
        method: apideploy_client::HttpMethod,
        url: String,
        status: u16,
        data: Value,
    },
    #[error(transparent)]
    Interrupted(#[from] InterruptedError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// No endpoint for the action, or a URL parameter with no source.
    Configuration,
    /// The request was sent and failed, or never reached the service.
    Transport,
    /// The entity lacks, or has malformed, data that the endpoint needs.
    DataShape,
    /// The batch was interrupted before the change was sent.
    Interrupted,
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Build(e) if e.is_configuration() => ErrorKind::Configuration,
            DeployError::Build(_) => ErrorKind::DataShape,
            DeployError::Transport(_) | DeployError::UnsuccessfulStatus { .. } => {
                ErrorKind::Transport
            }
            DeployError::Interrupted(_) => ErrorKind::Interrupted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A deploy failure, attributed to the change that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeError {
    pub elem_id: ElemId,
    pub message: String,
    pub severity: Severity,
    pub kind: ErrorKind,
}

impl ChangeError {
    pub fn new(elem_id: ElemId, error: &DeployError) -> Self {
        ChangeError {
            elem_id,
            message: error.to_string(),
            severity: Severity::Error,
            kind: error.kind(),
        }
    }
}
