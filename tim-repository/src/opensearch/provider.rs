//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `ClusterProvider`
//! using the OpenSearch Rust crate, plus the connection setup for local
//! development clusters and AWS-hosted domains.

use std::error::Error as StdError;
use std::future::Future;
use std::io;

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cat::{CatAliasesParts, CatIndicesParts},
    http::{
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{
        IndicesCreateParts, IndicesDeleteAliasParts, IndicesDeleteParts, IndicesExistsParts,
        IndicesGetAliasParts, IndicesRefreshParts,
    },
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use tim_shared::{AliasEntry, ClusterInfo, IndexSummary};

use crate::config::BulkConfig;
use crate::errors::TimError;
use crate::interfaces::ClusterProvider;
use crate::types::AliasAction;

/// Hosts treated as a local development cluster.
pub const LOCAL_HOSTS: &[&str] = &["localhost", "opensearch"];

/// Port of a local development cluster.
pub const LOCAL_PORT: u16 = 9200;

/// Port of an AWS-hosted domain.
pub const AWS_PORT: u16 = 443;

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Signing service name for AWS OpenSearch domains.
const AWS_SERVICE_NAME: &str = "es";

/// Credentials of the local development cluster.
const LOCAL_USERNAME: &str = "admin";
const LOCAL_PASSWORD: &str = "admin";

/// Whether an endpoint refers to a local development cluster.
pub fn is_local_host(endpoint: &str) -> bool {
    LOCAL_HOSTS.contains(&endpoint)
}

/// OpenSearch provider implementation.
///
/// Every request goes through the same retry loop: timeouts, dropped
/// connections and throttling responses are retried with exponential backoff up to `max_retries` times.
///
/// # Example
///
/// ```ignore
/// use tim_repository::{BulkConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::connect("localhost", "us-east-1", BulkConfig::default()).await?;
/// let info = provider.info().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    config: BulkConfig,
}

impl OpenSearchProvider {
    /// Create a provider for the given endpoint host (without scheme).
    ///
    /// `localhost` and `opensearch` connect over plain HTTP on port 9200 with the
    /// development credentials. Any other host connects over HTTPS on port 443 and
    /// signs requests with AWS credentials resolved from the environment.
    ///
    /// No request is sent here; bad credentials only surface on the first call.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The cluster host, e.g. "search-timdex-env-1234567890.us-east-1.es.amazonaws.com"
    /// * `aws_region` - Region used for request signing
    /// * `config` - Request tuning
    pub async fn connect(
        endpoint: &str,
        aws_region: &str,
        config: BulkConfig,
    ) -> Result<Self, TimError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(TimError::validation("OpenSearch endpoint cannot be empty"));
        }

        info!(
            max_chunk_bytes = config.max_chunk_bytes,
            max_retries = config.max_retries,
            request_timeout_secs = config.request_timeout.as_secs(),
            "OpenSearch request configuration"
        );

        if is_local_host(endpoint) {
            let url = format!("http://{}:{}", endpoint, LOCAL_PORT);
            let credentials =
                Credentials::Basic(LOCAL_USERNAME.to_string(), LOCAL_PASSWORD.to_string());
            return Self::build(&url, Some(credentials), None, config);
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(aws_region.to_string()))
            .load()
            .await;
        let credentials = Credentials::try_from(&sdk_config)?;
        let url = format!("https://{}:{}", endpoint, AWS_PORT);
        Self::build(&url, Some(credentials), Some(AWS_SERVICE_NAME), config)
    }

    /// Create an unauthenticated provider for a full URL (scheme, host and port).
    pub fn from_url(url: &str, config: BulkConfig) -> Result<Self, TimError> {
        Self::build(url, None, None, config)
    }

    fn build(
        url: &str,
        credentials: Option<Credentials>,
        service_name: Option<&'static str>,
        config: BulkConfig,
    ) -> Result<Self, TimError> {
        let parsed_url = Url::parse(url)
            .map_err(|e| TimError::validation(format!("Invalid OpenSearch URL '{}': {}", url, e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(config.request_timeout)
            .disable_proxy();
        if let Some(credentials) = credentials {
            builder = builder.auth(credentials);
        }
        if let Some(service_name) = service_name {
            builder = builder.service_name(service_name);
        }
        let transport = builder.build().map_err(|e| {
            TimError::configuration(format!("Failed to build OpenSearch transport: {}", e))
        })?;

        debug!(url = %url, "Created OpenSearch provider");

        Ok(Self {
            client: OpenSearch::new(transport),
            config,
        })
    }

    /// The request tuning this provider was built with.
    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Send a request, retrying timeouts, connection failures and throttling
    /// responses.
    async fn send_with_retry<F, Fut>(&self, operation: &str, send: F) -> Result<Response, TimError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Response, opensearch::Error>>,
    {
        let mut attempt = 0;
        loop {
            let can_retry = attempt < self.config.max_retries;
            match send().await {
                Ok(response) if can_retry && is_transient_status(response.status_code()) => {
                    warn!(
                        operation,
                        status = response.status_code().as_u16(),
                        attempt = attempt + 1,
                        "Transient response from OpenSearch, retrying"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if can_retry && e.is_timeout() => {
                    warn!(
                        operation,
                        error = %e,
                        attempt = attempt + 1,
                        "OpenSearch request timed out, retrying"
                    );
                }
                Err(e) if can_retry && is_connection_error(&e) => {
                    warn!(
                        operation,
                        error = %e,
                        attempt = attempt + 1,
                        "Connection to OpenSearch failed, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(self.config.backoff_for(attempt)).await;
            attempt += 1;
        }
    }
}

/// Status codes worth retrying: throttling and gateway hiccups.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

/// Whether a transport error comes from a refused, reset or dropped connection.
///
/// The HTTP client error is usually a few levels down the source chain, under
/// the opensearch wrapper and above the socket error.
fn is_connection_error(error: &opensearch::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
            if http.is_connect() {
                return true;
            }
        }
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// A failed response, read into its parts.
struct ErrorResponse {
    status: u16,
    body: String,
    json: Value,
}

impl ErrorResponse {
    async fn read(response: Response) -> Self {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        let json = serde_json::from_str(&body).unwrap_or(Value::Null);
        Self { status, body, json }
    }

    /// The `error.type` field of the body, if any.
    fn error_type(&self) -> Option<&str> {
        self.json["error"]["type"].as_str()
    }

    /// The `error.index` field of the body, if any.
    fn error_index(&self) -> Option<&str> {
        self.json["error"]["index"].as_str()
    }

    fn into_api_error(self) -> TimError {
        TimError::api(self.status, self.body)
    }
}

#[async_trait]
impl ClusterProvider for OpenSearchProvider {
    async fn info(&self) -> Result<ClusterInfo, TimError> {
        let response = self
            .send_with_retry("info", || async { self.client.info().send().await })
            .await?;
        if !response.status_code().is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }
        Ok(response.json::<ClusterInfo>().await?)
    }

    async fn cat_aliases(&self) -> Result<Vec<AliasEntry>, TimError> {
        let response = self
            .send_with_retry("cat_aliases", || async {
                self.client
                    .cat()
                    .aliases(CatAliasesParts::None)
                    .format("json")
                    .send()
                    .await
            })
            .await?;
        if !response.status_code().is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }
        let aliases = response.json::<Vec<AliasEntry>>().await?;
        debug!(count = aliases.len(), "Fetched aliases");
        Ok(aliases)
    }

    async fn cat_indices(&self) -> Result<Vec<IndexSummary>, TimError> {
        let response = self
            .send_with_retry("cat_indices", || async {
                self.client
                    .cat()
                    .indices(CatIndicesParts::None)
                    .format("json")
                    .send()
                    .await
            })
            .await?;
        if !response.status_code().is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }
        let indexes = response.json::<Vec<IndexSummary>>().await?;
        debug!(count = indexes.len(), "Fetched indexes");
        Ok(indexes)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, TimError> {
        let response = self
            .send_with_retry("index_exists", || async {
                self.client
                    .indices()
                    .exists(IndicesExistsParts::Index(&[index]))
                    .send()
                    .await
            })
            .await?;
        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Err(ErrorResponse::read(response).await.into_api_error()),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<String, TimError> {
        let response = self
            .send_with_retry("create_index", || async {
                self.client
                    .indices()
                    .create(IndicesCreateParts::Index(index))
                    .body(body.clone())
                    .send()
                    .await
            })
            .await?;

        if !response.status_code().is_success() {
            let error = ErrorResponse::read(response).await;
            if error.error_type() == Some("resource_already_exists_exception") {
                return Err(TimError::index_exists(index));
            }
            return Err(error.into_api_error());
        }

        let json = response.json::<Value>().await?;
        debug!(response = %json, "Index created");
        Ok(json["index"].as_str().unwrap_or(index).to_string())
    }

    async fn delete_index(&self, index: &str) -> Result<(), TimError> {
        let response = self
            .send_with_retry("delete_index", || async {
                self.client
                    .indices()
                    .delete(IndicesDeleteParts::Index(&[index]))
                    .send()
                    .await
            })
            .await?;

        let status = response.status_code();
        if status == StatusCode::NOT_FOUND {
            return Err(TimError::index_not_found(index));
        }
        if !status.is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn index_aliases(&self, index: &str) -> Result<Vec<String>, TimError> {
        let response = self
            .send_with_retry("index_aliases", || async {
                self.client
                    .indices()
                    .get_alias(IndicesGetAliasParts::Index(&[index]))
                    .send()
                    .await
            })
            .await?;

        let status = response.status_code();
        if status == StatusCode::NOT_FOUND {
            return Err(TimError::index_not_found(index));
        }
        if !status.is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }

        // Shape: {"<index>": {"aliases": {"<alias>": {}, ...}}}
        let json = response.json::<Value>().await?;
        debug!(response = %json, "Fetched index aliases");
        let aliases = json[index]["aliases"]
            .as_object()
            .map(|aliases| aliases.keys().cloned().collect())
            .unwrap_or_default();
        Ok(aliases)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), TimError> {
        let body = json!({ "actions": actions });
        let response = self
            .send_with_retry("update_aliases", || async {
                self.client
                    .indices()
                    .update_aliases()
                    .body(body.clone())
                    .send()
                    .await
            })
            .await?;

        if !response.status_code().is_success() {
            let error = ErrorResponse::read(response).await;
            if error.error_type() == Some("index_not_found_exception") {
                let index = error
                    .error_index()
                    .or_else(|| actions.first().map(AliasAction::index))
                    .unwrap_or_default();
                return Err(TimError::index_not_found(index));
            }
            return Err(error.into_api_error());
        }

        debug!(actions = %body, "Aliases updated");
        Ok(())
    }

    async fn delete_alias(&self, index: &str, alias: &str) -> Result<(), TimError> {
        let response = self
            .send_with_retry("delete_alias", || async {
                self.client
                    .indices()
                    .delete_alias(IndicesDeleteAliasParts::IndexName(&[index], &[alias]))
                    .send()
                    .await
            })
            .await?;

        if !response.status_code().is_success() {
            let error = ErrorResponse::read(response).await;
            return Err(match error.error_type() {
                Some("index_not_found_exception") => TimError::index_not_found(index),
                Some("aliases_not_found_exception") => TimError::alias_not_found(alias, index),
                _ => error.into_api_error(),
            });
        }

        debug!(index = %index, alias = %alias, "Alias removed");
        Ok(())
    }

    async fn bulk(&self, index: &str, lines: Vec<String>) -> Result<Vec<Value>, TimError> {
        let response = self
            .send_with_retry("bulk", || async {
                self.client
                    .bulk(BulkParts::Index(index))
                    .body(lines.clone())
                    .send()
                    .await
            })
            .await?;

        if !response.status_code().is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }

        let mut json = response.json::<Value>().await?;
        match json.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(TimError::api(200, json.to_string())),
        }
    }

    async fn refresh(&self, index: &str) -> Result<(), TimError> {
        let response = self
            .send_with_retry("refresh", || async {
                self.client
                    .indices()
                    .refresh(IndicesRefreshParts::Index(&[index]))
                    .send()
                    .await
            })
            .await?;

        let status = response.status_code();
        if status == StatusCode::NOT_FOUND {
            return Err(TimError::index_not_found(index));
        }
        if !status.is_success() {
            return Err(ErrorResponse::read(response).await.into_api_error());
        }
        debug!(index = %index, "Index refreshed");
        Ok(())
    }
}
