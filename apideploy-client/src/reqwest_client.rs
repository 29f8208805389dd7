use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{ClientError, HttpClient, HttpMethod, RequestArgs, Response};

/// An [`HttpClient`] that sends JSON requests relative to a base URL.
///
/// Headers (for instance authorization) are attached to every request. Timeouts
/// and connection pooling are those of the `reqwest::Client` passed in.
pub struct ReqwestClient {
    http_client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl ReqwestClient {
    pub fn new(base_url: &str, headers: HeaderMap) -> Self {
        Self::with_client(Client::new(), base_url, headers)
    }

    pub fn with_client(http_client: Client, base_url: &str, headers: HeaderMap) -> Self {
        debug!("Creating HTTP client for base URL: {}", base_url);
        ReqwestClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        }
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    async fn request(
        &self,
        method: HttpMethod,
        args: RequestArgs,
    ) -> Result<Response, ClientError> {
        let url = self.full_url(&args.url);
        debug!("{} {}", method, url);
        trace!("Query params: {:?}", args.query_params);
        trace!("Body: {:?}", args.data);

        let mut builder = self
            .http_client
            .request(to_reqwest_method(method), &url)
            .headers(self.headers.clone());
        if let Some(query_params) = &args.query_params {
            builder = builder.query(query_params);
        }
        if let Some(data) = &args.data {
            builder = builder.json(data);
        }

        let response = builder.send().await.map_err(|e| ClientError::Request {
            url: url.clone(),
            source: Box::new(e),
        })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ClientError::Request {
            url: url.clone(),
            source: Box::new(e),
        })?;
        let data = parse_body(&text);
        debug!("{} {} -> {}", method, url, status);

        if (200..300).contains(&status) {
            Ok(Response { status, data })
        } else {
            Err(ClientError::Status { url, status, data })
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Bodies are JSON when they parse as JSON, text otherwise, and `null` when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, args: RequestArgs) -> Result<Response, ClientError> {
        self.request(HttpMethod::Get, args).await
    }
    async fn post(&self, args: RequestArgs) -> Result<Response, ClientError> {
        self.request(HttpMethod::Post, args).await
    }
    async fn put(&self, args: RequestArgs) -> Result<Response, ClientError> {
        self.request(HttpMethod::Put, args).await
    }
    async fn patch(&self, args: RequestArgs) -> Result<Response, ClientError> {
        self.request(HttpMethod::Patch, args).await
    }
    async fn delete(&self, args: RequestArgs) -> Result<Response, ClientError> {
        self.request(HttpMethod::Delete, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_url() {
        let client = ReqwestClient::new("https://example.atlassian.net/", HeaderMap::new());
        assert_eq!(
            client.full_url("/rest/api/3/field"),
            "https://example.atlassian.net/rest/api/3/field"
        );
        assert_eq!(
            client.full_url("rest/api/3/field"),
            "https://example.atlassian.net/rest/api/3/field"
        );
        assert_eq!(
            client.full_url("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body(r#"{"id": 10}"#), json!({ "id": 10 }));
        assert_eq!(parse_body("Created"), json!("Created"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let client = ReqwestClient::new("http://127.0.0.1:9", HeaderMap::new());
        let err = client
            .delete(RequestArgs {
                url: "/x".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Request { .. }));
        assert_eq!(err.status(), None);
    }
}
