//! Contract of the remote statement service.
//!
//! The store only talks to the service through [`FlinkGateway`]; the HTTP
//! implementation lives in the CLI crate and tests use scripted fakes.

use std::future::Future;

use flink_proto::{ResultPage, Statement, StatementException};
use thiserror::Error;

/// Failure of a gateway call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    /// Error message.
    pub message: String,
    /// HTTP status code, when the call reached the service.
    pub status_code: Option<u16>,
    /// Status detail of the statement, when the service returned one.
    pub detail: Option<String>,
}

impl GatewayError {
    /// Create an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            detail: None,
        }
    }

    /// Attach an HTTP status code.
    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach a status detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Statement service operations used by the store.
pub trait FlinkGateway: Send + Sync {
    /// Create a statement. The principal travels in the statement spec.
    fn create_statement(
        &self,
        statement: &Statement,
        environment_id: &str,
        organization_id: &str,
    ) -> impl Future<Output = Result<Statement, GatewayError>> + Send;

    /// Get a statement by name.
    fn get_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> impl Future<Output = Result<Statement, GatewayError>> + Send;

    /// Get one page of results; an empty token requests the first page.
    fn get_statement_results(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
        page_token: &str,
    ) -> impl Future<Output = Result<ResultPage, GatewayError>> + Send;

    /// Replace a statement.
    fn update_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
        statement: &Statement,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Delete a statement.
    fn delete_statement(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Get the exceptions of a statement, most recent first.
    fn get_exceptions(
        &self,
        environment_id: &str,
        name: &str,
        organization_id: &str,
    ) -> impl Future<Output = Result<Vec<StatementException>, GatewayError>> + Send;
}

/// Identity and placement of a session's statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Organization that owns the statements.
    pub organization_id: String,
    /// Environment that owns the statements.
    pub environment_id: String,
    /// Compute pool that executes the statements.
    pub compute_pool_id: Option<String>,
    /// Principal used when no service account is set.
    pub user_principal: Option<String>,
}

impl SessionContext {
    /// Create a context for an organization and environment.
    #[must_use]
    pub fn new(organization_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: environment_id.into(),
            ..Self::default()
        }
    }

    /// Set the compute pool.
    #[must_use]
    pub fn with_compute_pool(mut self, compute_pool_id: impl Into<String>) -> Self {
        self.compute_pool_id = Some(compute_pool_id.into());
        self
    }

    /// Set the user principal.
    #[must_use]
    pub fn with_user_principal(mut self, principal: impl Into<String>) -> Self {
        self.user_principal = Some(principal.into());
        self
    }
}
