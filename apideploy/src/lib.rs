//! The deploy dispatcher: sending changes to a service through an
//! [`HttpClient`](apideploy_client::HttpClient), using the endpoints of a
//! [`DeployConfig`](apideploy_request::DeployConfig).

pub mod deploy;
pub mod error;
pub mod interrupt;
pub mod order;

pub use deploy::{
    deploy_change, deploy_changes, deploy_changes_concurrently, deploy_changes_until,
    ChangeDeployer, DeployResult, StandardDeployer,
};
pub use error::{ChangeError, DeployError, ErrorKind, Severity};
pub use interrupt::{InterruptState, InterruptedError};
pub use order::order_by_dependencies;
