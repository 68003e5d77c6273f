//! HTTP client for the statement service.
//!
//! Statements live under
//! `{base}/sql/v1/organizations/{org}/environments/{env}/statements`; results
//! and exceptions are sub-resources of a statement. Requests carry the API
//! token as a bearer token.

use std::time::Duration;

use flink_proto::{ExceptionList, ResultPage, Statement, StatementException};
use flink_store::{FlinkGateway, GatewayError};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::CliError;

/// Default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_TOKEN_PARAM: &str = "page_token";

/// Statement service client over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// Error body returned by the service.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl HttpGateway {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, CliError> {
        Self::with_timeout(base_url, token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, CliError> {
        let base = Url::parse(base_url)
            .map_err(|e| CliError::Config(format!("invalid gateway URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CliError::Config(format!("invalid gateway URL '{base_url}'")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flink-shell/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// URL of the statement collection, or of one statement and an optional
    /// sub-resource.
    fn url(&self, organization_id: &str, environment_id: &str, path: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| GatewayError::new("gateway URL can't carry a path"))?;
            segments
                .pop_if_empty()
                .extend(["sql", "v1", "organizations", organization_id])
                .extend(["environments", environment_id, "statements"])
                .extend(path);
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| GatewayError::new(format!("request failed: {e}")))?;
        let status = response.status();
        trace!(status = %status, url = %response.url(), "response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = self.send(request).await?;
        let status = response.status();
        response.json::<T>().await.map_err(|e| {
            GatewayError::new(format!("invalid response body: {e}")).with_status_code(status.as_u16())
        })
    }
}

fn error_from_body(status: StatusCode, body: &str) -> GatewayError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let first = parsed.errors.into_iter().next();
    let message = first
        .as_ref()
        .and_then(|e| e.title.clone())
        .or(parsed.message)
        .unwrap_or_else(|| format!("request failed with status {status}"));
    let mut err = GatewayError::new(message).with_status_code(status.as_u16());
    if let Some(detail) = first.and_then(|e| e.detail).filter(|d| !d.is_empty()) {
        err = err.with_detail(detail);
    }
    err
}

impl FlinkGateway for HttpGateway {
    async fn create_statement(
        &self,
        statement: &Statement,
        environment_id: &str,
        organization_id: &str,
    ) -> Result<Statement, GatewayError> {
        let url = self.url(organization_id, environment_id, &[])?;
        debug!(statement = %statement.name, "creating statement");
        self.send_json(self.http.post(url).json(statement)).await
    }

    async fn get_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> Result<Statement, GatewayError> {
        let url = self.url(organization_id, environment_id, &[name])?;
        self.send_json(self.http.get(url)).await
    }

    async fn get_statement_results(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
        page_token: &str,
    ) -> Result<ResultPage, GatewayError> {
        let mut url = self.url(organization_id, environment_id, &[name, "results"])?;
        if !page_token.is_empty() {
            url.query_pairs_mut().append_pair(PAGE_TOKEN_PARAM, page_token);
        }
        self.send_json(self.http.get(url)).await
    }

    async fn update_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
        statement: &Statement,
    ) -> Result<(), GatewayError> {
        let url = self.url(organization_id, environment_id, &[name])?;
        self.send(self.http.put(url).json(statement)).await.map(drop)
    }

    async fn delete_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> Result<(), GatewayError> {
        let url = self.url(organization_id, environment_id, &[name])?;
        self.send(self.http.delete(url)).await.map(drop)
    }

    async fn get_exceptions(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> Result<Vec<StatementException>, GatewayError> {
        let url = self.url(organization_id, environment_id, &[name, "exceptions"])?;
        let list: ExceptionList = self.send_json(self.http.get(url)).await?;
        Ok(list.data)
    }
}
