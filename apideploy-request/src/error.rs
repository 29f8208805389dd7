use std::path::PathBuf;

use apideploy_core::{ActionKind, ElemId, FieldPath};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("URL template {0:?} has an unclosed `{{`")]
    Unclosed(String),
    #[error("URL template {0:?} has a `}}` without a matching `{{`")]
    Unopened(String),
    #[error("URL template {0:?} has an empty parameter name")]
    EmptyParam(String),
}

/// Failure to load a deploy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read deploy configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid deploy configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to build the request for one change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("No endpoint of type {action} for {type_name}")]
    MissingEndpoint {
        action: ActionKind,
        type_name: String,
    },
    #[error("URL parameter {param} of {url} is not in urlParamsToFields and {elem_id} has no field named {param}")]
    UnmappedUrlParam {
        param: String,
        url: String,
        elem_id: ElemId,
    },
    #[error("URL parameter {param} could not be resolved from field path {path} of {elem_id}")]
    UnresolvedUrlParam {
        param: String,
        path: FieldPath,
        elem_id: ElemId,
    },
    #[error("URL parameter {param} resolved from field path {path} of {elem_id} is not a scalar value")]
    NonScalarUrlParam {
        param: String,
        path: FieldPath,
        elem_id: ElemId,
    },
}

impl BuildError {
    /// Whether the endpoint configuration, rather than the entity's data, is at fault.
    pub fn is_configuration(&self) -> bool {
        match self {
            BuildError::MissingEndpoint { .. } | BuildError::UnmappedUrlParam { .. } => true,
            BuildError::UnresolvedUrlParam { .. } | BuildError::NonScalarUrlParam { .. } => false,
        }
    }
}
