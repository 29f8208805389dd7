//! Turning a [`Change`](apideploy_core::Change) into an HTTP request, as
//! described by a declarative per-type endpoint configuration.

pub mod config;
pub mod error;
pub mod request;
pub mod url;

pub use config::{DeployConfig, DeploymentRequestsByAction, EndpointDefinition, TypeDeployConfig};
pub use error::{BuildError, ConfigError, TemplateError};
pub use request::{build_request, build_request_for, HttpRequest};
pub use url::{build_url, BuiltUrl, UrlTemplate};
