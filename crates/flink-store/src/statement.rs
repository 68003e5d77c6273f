//! Client-visible state of processed statements.

use std::fmt;

use chrono::{DateTime, Utc};
use flink_proto::{Operation, Phase, ResultSchema, Statement};
use serde::Serialize;

use crate::router::strip_leading_noise;

/// Kind of a processed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    /// Local `SET`.
    Set,
    /// Local `USE`.
    Use,
    /// Local `RESET`.
    Reset,
    /// Remote statement.
    Other,
}

/// Result of processing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// The statement was handled locally or submitted remotely.
    Processed(ProcessedStatement),
    /// `EXIT` or `QUIT`; the owning loop decides how to unwind.
    ExitRequested,
}

/// One statement's client-visible state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedStatement {
    name: String,
    statement: String,
    kind: StatementKind,
    pub(crate) status: Phase,
    pub(crate) status_detail: String,
    is_local_statement: bool,
    is_select_statement: bool,
    is_sensitive_statement: bool,
    is_append_only: bool,
    upsert_columns: Vec<usize>,
    result_schema: Option<ResultSchema>,
    pub(crate) results: StatementResults,
    pub(crate) page_token: String,
    created_at: DateTime<Utc>,
}

impl ProcessedStatement {
    /// Create a completed local statement.
    pub(crate) fn local(
        kind: StatementKind,
        statement: &str,
        results: StatementResults,
        status_detail: impl Into<String>,
    ) -> Self {
        Self {
            name: String::new(),
            statement: statement.to_string(),
            kind,
            status: Phase::Completed,
            status_detail: status_detail.into(),
            is_local_statement: true,
            is_select_statement: false,
            is_sensitive_statement: false,
            is_append_only: true,
            upsert_columns: Vec::new(),
            result_schema: None,
            results,
            page_token: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Create the client view of a remote statement.
    #[must_use]
    pub fn from_remote(remote: &Statement, status_detail: impl Into<String>) -> Self {
        let traits = remote.traits();
        let sql = remote.spec.statement.as_str();
        let is_select_statement = match traits.map(|t| t.sql_kind.as_str()) {
            Some(kind) if !kind.is_empty() => kind.eq_ignore_ascii_case("SELECT"),
            _ => starts_with_keyword(sql, "SELECT"),
        };
        let result_schema = traits.and_then(|t| t.schema.clone());
        let results = StatementResults {
            headers: result_schema
                .as_ref()
                .map(ResultSchema::column_names)
                .unwrap_or_default(),
            rows: Vec::new(),
        };

        Self {
            name: remote.name.clone(),
            statement: sql.to_string(),
            kind: StatementKind::Other,
            status: remote.phase(),
            status_detail: status_detail.into(),
            is_local_statement: false,
            is_select_statement,
            is_sensitive_statement: sql.to_ascii_lowercase().contains("secret"),
            is_append_only: traits.is_some_and(|t| t.is_append_only),
            upsert_columns: traits.map(|t| t.upsert_columns.clone()).unwrap_or_default(),
            result_schema,
            results,
            page_token: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Mark the statement as sensitive so it is kept out of history.
    #[must_use]
    pub(crate) fn sensitive(mut self, sensitive: bool) -> Self {
        self.is_sensitive_statement = sensitive;
        self
    }

    /// Server-assigned or generated name; empty for local statements.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SQL text.
    #[must_use]
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Statement kind.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Last observed phase.
    #[must_use]
    pub const fn status(&self) -> Phase {
        self.status
    }

    /// Last observed status detail.
    #[must_use]
    pub fn status_detail(&self) -> &str {
        &self.status_detail
    }

    /// Whether the statement was handled client-side.
    #[must_use]
    pub const fn is_local_statement(&self) -> bool {
        self.is_local_statement
    }

    /// Whether the statement is a query.
    #[must_use]
    pub const fn is_select_statement(&self) -> bool {
        self.is_select_statement
    }

    /// Whether the statement may carry credentials.
    #[must_use]
    pub const fn is_sensitive_statement(&self) -> bool {
        self.is_sensitive_statement
    }

    /// Whether the results only ever insert rows.
    #[must_use]
    pub const fn is_append_only(&self) -> bool {
        self.is_append_only
    }

    /// Column indexes of the upsert key.
    #[must_use]
    pub fn upsert_columns(&self) -> &[usize] {
        &self.upsert_columns
    }

    /// Declared result schema.
    #[must_use]
    pub fn result_schema(&self) -> Option<&ResultSchema> {
        self.result_schema.as_ref()
    }

    /// Results fetched so far.
    #[must_use]
    pub fn results(&self) -> &StatementResults {
        &self.results
    }

    /// Cursor of the next result page; empty when there are no more pages.
    #[must_use]
    pub fn page_token(&self) -> &str {
        &self.page_token
    }

    /// Whether another result page can be fetched.
    #[must_use]
    pub fn has_more_pages(&self) -> bool {
        !self.page_token.is_empty()
    }

    /// When the client created this view.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the statement reached a terminal phase.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Tabular statement results.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatementResults {
    /// Column names.
    pub headers: Vec<String>,
    /// Rows in arrival order.
    pub rows: Vec<ResultRow>,
}

impl StatementResults {
    /// Build `Key`/`Value` results from string pairs.
    #[must_use]
    pub fn key_value<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = [String; 2]>,
    {
        Self {
            headers: vec!["Key".to_string(), "Value".to_string()],
            rows: rows
                .into_iter()
                .map(|pair| ResultRow::insert(pair.into_iter().map(Field::varchar).collect()))
                .collect(),
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One converted result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Changelog operation.
    #[serde(serialize_with = "serialize_operation")]
    pub operation: Operation,
    /// Values in column order.
    pub fields: Vec<Field>,
}

impl ResultRow {
    /// Create an insert row.
    #[must_use]
    pub fn insert(fields: Vec<Field>) -> Self {
        Self {
            operation: Operation::Insert,
            fields,
        }
    }
}

fn serialize_operation<S: serde::Serializer>(op: &Operation, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(op)
}

/// One converted value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// SQL `NULL`.
    Null,
    /// Scalar value in its string form.
    Atomic {
        /// Value as sent by the server.
        value: String,
        /// SQL type name.
        data_type: String,
    },
    /// `ARRAY` or `MULTISET`.
    Array(Vec<Field>),
    /// `MAP` as ordered entries.
    Map(Vec<(Field, Field)>),
    /// `ROW`.
    Row(Vec<Field>),
}

impl Field {
    /// Create a `VARCHAR` value.
    #[must_use]
    pub fn varchar(value: impl Into<String>) -> Self {
        Self::Atomic {
            value: value.into(),
            data_type: "VARCHAR".to_string(),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Atomic { value, .. } => serializer.serialize_str(value),
            Self::Array(items) | Self::Row(items) => serializer.collect_seq(items),
            Self::Map(entries) => serializer.collect_seq(entries.iter().map(|(k, v)| [k, v])),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Atomic { value, .. } => f.write_str(value),
            Self::Array(items) => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            Self::Row(fields) => {
                f.write_str("(")?;
                write_joined(f, fields.iter())?;
                f.write_str(")")
            }
        }
    }
}

fn write_joined<'a>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = &'a Field>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let body = strip_leading_noise(sql);
    body.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        && body[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_')
}
