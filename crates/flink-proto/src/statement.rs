//! Statement resource as exchanged with the statement service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Phase;

/// A statement resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Statement {
    /// Unique statement name within the environment.
    pub name: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: String,
    /// Owning environment.
    #[serde(default)]
    pub environment_id: String,
    /// Desired state.
    pub spec: StatementSpec,
    /// Observed state, absent until the server has processed the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatementStatus>,
}

impl Statement {
    /// Create a statement resource ready for submission.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: StatementSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            ..Self::default()
        }
    }

    /// Current phase, `PENDING` when the server has not reported one yet.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.status.as_ref().map_or(Phase::Pending, |s| s.phase)
    }

    /// Server-provided status detail, empty when absent.
    #[must_use]
    pub fn detail(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.detail.as_str())
    }

    /// Server-provided traits, if any.
    #[must_use]
    pub fn traits(&self) -> Option<&StatementTraits> {
        self.status.as_ref().and_then(|s| s.traits.as_ref())
    }
}

/// Desired state of a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatementSpec {
    /// The SQL text.
    pub statement: String,
    /// Session properties forwarded with the statement.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Compute pool that executes the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_pool_id: Option<String>,
    /// Identity the statement runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    /// Whether the statement should be stopped.
    #[serde(default)]
    pub stopped: bool,
}

impl StatementSpec {
    /// Create a spec for the given SQL text.
    #[must_use]
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::default()
        }
    }

    /// Set the forwarded properties.
    #[must_use]
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Set the compute pool.
    #[must_use]
    pub fn with_compute_pool(mut self, compute_pool_id: impl Into<String>) -> Self {
        self.compute_pool_id = Some(compute_pool_id.into());
        self
    }

    /// Set the principal.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }
}

/// Observed state of a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatementStatus {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Human-readable detail, often an error or a retryable condition.
    #[serde(default)]
    pub detail: String,
    /// Properties derived by the server when planning the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<StatementTraits>,
}

impl StatementStatus {
    /// Create a status with the given phase and no detail.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    /// Set the detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Set the traits.
    #[must_use]
    pub fn with_traits(mut self, traits: StatementTraits) -> Self {
        self.traits = Some(traits);
        self
    }
}

/// Planner-derived properties of a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatementTraits {
    /// Statement kind, e.g. `SELECT`, `CREATE_TABLE`.
    #[serde(default)]
    pub sql_kind: String,
    /// Whether the result is bounded.
    #[serde(default)]
    pub is_bounded: bool,
    /// Whether the result only ever inserts rows.
    #[serde(default)]
    pub is_append_only: bool,
    /// Column indexes forming the upsert key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upsert_columns: Vec<usize>,
    /// Result schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ResultSchema>,
    /// When the server planned the statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Declared schema of the statement results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResultSchema {
    /// Result columns in order.
    #[serde(default)]
    pub columns: Vec<ColumnDetails>,
}

impl ResultSchema {
    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// One result column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDetails {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl ColumnDetails {
    /// Create a column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Logical SQL type of a column or nested value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataType {
    /// Type root, e.g. `INTEGER`, `VARCHAR`, `ARRAY`, `MAP`, `ROW`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether values may be null.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Element type of `ARRAY` and `MULTISET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Box<DataType>>,
    /// Key type of `MAP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<Box<DataType>>,
    /// Value type of `MAP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Box<DataType>>,
    /// Field types of `ROW`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RowFieldType>,
}

const fn default_nullable() -> bool {
    true
}

impl DataType {
    /// Create an atomic type.
    #[must_use]
    pub fn atomic(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            nullable: true,
            ..Self::default()
        }
    }

    /// Create an `ARRAY` type.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self {
            element_type: Some(Box::new(element)),
            ..Self::atomic("ARRAY")
        }
    }

    /// Create a `MAP` type.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self {
            key_type: Some(Box::new(key)),
            value_type: Some(Box::new(value)),
            ..Self::atomic("MAP")
        }
    }

    /// Create a `ROW` type.
    #[must_use]
    pub fn row(fields: Vec<RowFieldType>) -> Self {
        Self {
            fields,
            ..Self::atomic("ROW")
        }
    }
}

/// One field of a `ROW` type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowFieldType {
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: DataType,
}
