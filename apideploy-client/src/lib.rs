//! The transport seam of apideploy.
//!
//! The deploy engine only shapes requests; sending them is the job of an
//! [`HttpClient`]. Retries, authentication and timeouts belong to the client.

mod reqwest_client;

use std::{collections::BTreeMap, fmt::Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use reqwest_client::ReqwestClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        })
    }
}

/// The arguments of a single call: `{url, data?, queryParams?}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestArgs {
    pub url: String,
    pub data: Option<Value>,
    pub query_params: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub data: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not produce a response.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The service answered with a non-success status.
    #[error("request to {url} failed with status {status}: {data}")]
    Status { url: String, status: u16, data: Value },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { .. } => None,
            ClientError::Status { status, .. } => Some(*status),
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, args: RequestArgs) -> Result<Response, ClientError>;
    async fn post(&self, args: RequestArgs) -> Result<Response, ClientError>;
    async fn put(&self, args: RequestArgs) -> Result<Response, ClientError>;
    async fn patch(&self, args: RequestArgs) -> Result<Response, ClientError>;
    async fn delete(&self, args: RequestArgs) -> Result<Response, ClientError>;

    /// Dispatch to the operation named by `method`.
    async fn send(&self, method: HttpMethod, args: RequestArgs) -> Result<Response, ClientError> {
        match method {
            HttpMethod::Get => self.get(args).await,
            HttpMethod::Post => self.post(args).await,
            HttpMethod::Put => self.put(args).await,
            HttpMethod::Patch => self.patch(args).await,
            HttpMethod::Delete => self.delete(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<(HttpMethod, String)>>,
    }

    impl Recorder {
        fn record(&self, method: HttpMethod, args: RequestArgs) -> Result<Response, ClientError> {
            self.calls.lock().unwrap().push((method, args.url));
            Ok(Response {
                status: 204,
                data: json!(null),
            })
        }
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn get(&self, args: RequestArgs) -> Result<Response, ClientError> {
            self.record(HttpMethod::Get, args)
        }
        async fn post(&self, args: RequestArgs) -> Result<Response, ClientError> {
            self.record(HttpMethod::Post, args)
        }
        async fn put(&self, args: RequestArgs) -> Result<Response, ClientError> {
            self.record(HttpMethod::Put, args)
        }
        async fn patch(&self, args: RequestArgs) -> Result<Response, ClientError> {
            self.record(HttpMethod::Patch, args)
        }
        async fn delete(&self, args: RequestArgs) -> Result<Response, ClientError> {
            self.record(HttpMethod::Delete, args)
        }
    }

    #[tokio::test]
    async fn send_dispatches_by_method() {
        let client = Recorder {
            calls: Mutex::new(Vec::new()),
        };
        for method in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
        ] {
            let response = client
                .send(
                    method,
                    RequestArgs {
                        url: format!("/{}", method),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert!(response.is_success());
        }
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[3], (HttpMethod::Patch, "/patch".to_string()));
    }

    #[test]
    fn method_names_match_configuration() {
        let method: HttpMethod = serde_json::from_value(json!("delete")).unwrap();
        assert_eq!(method, HttpMethod::Delete);
        assert_eq!(method.to_string(), "delete");
    }
}
