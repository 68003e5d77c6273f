//! Shell configuration.
//!
//! Loaded from an optional JSON file, then overridden by command-line flags
//! and `FLINK_*` environment variables:
//!
//! ```json
//! {
//!   "gateway_url": "https://flink.example.com",
//!   "organization_id": "org-123",
//!   "environment_id": "env-456",
//!   "compute_pool_id": "pool-789",
//!   "catalog": "my_catalog",
//!   "properties": { "client.results-timeout": "60000" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, Offset};
use flink_store::SessionContext;
use flink_store::properties::{
    KEY_CATALOG, KEY_DATABASE, KEY_LOCAL_TIME_ZONE, SessionProperties,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::{Cli, parse_property};
use crate::error::CliError;

/// Default statement service URL.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";

/// Shell configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Statement service URL.
    pub gateway_url: String,
    /// Organization that owns the statements.
    pub organization_id: String,
    /// Environment that owns the statements.
    pub environment_id: String,
    /// Compute pool that runs the statements.
    pub compute_pool_id: Option<String>,
    /// Principal used when no service account is set.
    pub principal: Option<String>,
    /// Bearer token for the statement service.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Initial catalog.
    pub catalog: String,
    /// Initial database.
    pub database: String,
    /// Initial session properties.
    pub properties: BTreeMap<String, String>,
    /// History file; defaults to `~/.flink/history`.
    pub history_file: Option<PathBuf>,
    /// Number of history entries kept.
    pub history_size: usize,
    /// Result pages read per query.
    pub max_result_pages: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            organization_id: String::new(),
            environment_id: String::new(),
            compute_pool_id: None,
            principal: None,
            api_token: None,
            catalog: String::new(),
            database: String::new(),
            properties: BTreeMap::new(),
            history_file: None,
            history_size: 1000,
            max_result_pages: 100,
        }
    }
}

impl ShellConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        serde_json::from_str(content).map_err(|e| CliError::Config(format!("invalid JSON: {e}")))
    }

    /// Override values with command-line flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a `-D` property is not `KEY=VALUE`.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), CliError> {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut self.gateway_url, cli.gateway.as_ref());
        set(&mut self.organization_id, cli.organization.as_ref());
        set(&mut self.environment_id, cli.environment.as_ref());
        set(&mut self.catalog, cli.catalog.as_ref());
        set(&mut self.database, cli.database.as_ref());
        if cli.compute_pool.is_some() {
            self.compute_pool_id.clone_from(&cli.compute_pool);
        }
        if cli.principal.is_some() {
            self.principal.clone_from(&cli.principal);
        }
        if cli.token.is_some() {
            self.api_token.clone_from(&cli.token);
        }
        for raw in &cli.properties {
            let (key, value) = parse_property(raw)
                .ok_or_else(|| CliError::InvalidArgument(format!("expected KEY=VALUE, got '{raw}'")))?;
            self.properties.insert(key, value);
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        let url = Url::parse(&self.gateway_url)
            .map_err(|e| CliError::Config(format!("invalid gateway URL '{}': {e}", self.gateway_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CliError::Config(format!(
                "invalid gateway URL '{}', must start with http:// or https://",
                self.gateway_url
            )));
        }

        if self.organization_id.trim().is_empty() {
            return Err(CliError::Config("organization is required".to_string()));
        }
        if self.environment_id.trim().is_empty() {
            return Err(CliError::Config("environment is required".to_string()));
        }
        if !self.database.is_empty() && self.catalog.is_empty() {
            return Err(CliError::Config(
                "a database can only be selected together with a catalog".to_string(),
            ));
        }
        if let Some(key) = self
            .properties
            .keys()
            .find(|k| k.as_str() == KEY_CATALOG || k.as_str() == KEY_DATABASE)
        {
            return Err(CliError::Config(format!(
                "{key} can't be set as a property, use the catalog and database settings"
            )));
        }
        if self.max_result_pages == 0 {
            return Err(CliError::Config("max_result_pages must be positive".to_string()));
        }
        Ok(())
    }

    /// Properties that survive `RESET`.
    ///
    /// Catalog and database are not among them: switching catalog must be
    /// able to drop the database entirely.
    #[must_use]
    pub fn default_properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(KEY_LOCAL_TIME_ZONE.to_string(), local_time_zone())])
    }

    /// Values a new session starts with on top of the defaults.
    #[must_use]
    pub fn initial_properties(&self) -> BTreeMap<String, String> {
        let mut initial = self.properties.clone();
        if !self.catalog.is_empty() {
            initial.insert(KEY_CATALOG.to_string(), self.catalog.clone());
        }
        if !self.database.is_empty() {
            initial.insert(KEY_DATABASE.to_string(), self.database.clone());
        }
        initial
    }

    /// Session properties of a new session.
    #[must_use]
    pub fn session_properties(&self) -> SessionProperties {
        SessionProperties::new(self.default_properties(), self.initial_properties())
    }

    /// Identity and placement of the session's statements.
    #[must_use]
    pub fn session_context(&self) -> SessionContext {
        let mut context = SessionContext::new(&self.organization_id, &self.environment_id);
        context.compute_pool_id.clone_from(&self.compute_pool_id);
        context.user_principal.clone_from(&self.principal);
        context
    }

    /// History file location.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.history_file.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".flink")
                .join("history")
        })
    }
}

/// Local UTC offset as `GMT+hh:mm`.
#[must_use]
pub fn local_time_zone() -> String {
    format_offset(Local::now().offset().fix().local_minus_utc())
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("GMT{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}
