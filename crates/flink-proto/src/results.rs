//! Result pages and statement exceptions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// One page of statement results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResultPage {
    /// Paging metadata.
    #[serde(default)]
    pub metadata: ResultMetadata,
    /// Rows on this page.
    #[serde(default)]
    pub results: ResultData,
}

impl ResultPage {
    /// Create a page from rows and an optional next link.
    #[must_use]
    pub fn new(data: Vec<ResultItem>, next: Option<String>) -> Self {
        Self {
            metadata: ResultMetadata {
                next,
                ..ResultMetadata::default()
            },
            results: ResultData { data },
        }
    }

    /// Link to the next page, if any.
    #[must_use]
    pub fn next_link(&self) -> Option<&str> {
        self.metadata.next.as_deref()
    }
}

/// Paging metadata of a result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResultMetadata {
    /// Link to this page.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link to the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// When the page was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row container of a result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResultData {
    /// Raw rows.
    #[serde(default)]
    pub data: Vec<ResultItem>,
}

/// One raw changelog row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultItem {
    /// Changelog operation.
    #[serde(default)]
    pub op: Operation,
    /// Column values as raw JSON, in schema order.
    pub row: Vec<serde_json::Value>,
}

impl ResultItem {
    /// Create an insert row.
    #[must_use]
    pub fn insert(row: Vec<serde_json::Value>) -> Self {
        Self {
            op: Operation::Insert,
            row,
        }
    }
}

/// Changelog operation carried by each result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Operation {
    /// `+I`
    #[default]
    Insert,
    /// `-U`
    UpdateBefore,
    /// `+U`
    UpdateAfter,
    /// `-D`
    Delete,
}

impl TryFrom<u8> for Operation {
    type Error = ProtoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Insert),
            1 => Ok(Self::UpdateBefore),
            2 => Ok(Self::UpdateAfter),
            3 => Ok(Self::Delete),
            other => Err(ProtoError::InvalidOperation(other)),
        }
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Insert => 0,
            Operation::UpdateBefore => 1,
            Operation::UpdateAfter => 2,
            Operation::Delete => 3,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "+I",
            Self::UpdateBefore => "-U",
            Self::UpdateAfter => "+U",
            Self::Delete => "-D",
        };
        f.write_str(s)
    }
}

/// Exception recorded by the server for a statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatementException {
    /// Exception class or short name.
    #[serde(default)]
    pub name: String,
    /// Exception message.
    #[serde(default)]
    pub message: String,
    /// When the exception occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StatementException {
    /// Create an exception with a message.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            timestamp: None,
        }
    }
}

/// Exceptions of a statement, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExceptionList {
    /// Exceptions.
    #[serde(default)]
    pub data: Vec<StatementException>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_result_page_deserialize() {
        let json = r#"{
            "metadata": {
                "self": "https://flink.example/statements/s1/results",
                "next": "https://flink.example/statements/s1/results?page_token=ABC123"
            },
            "results": {"data": [
                {"op": 0, "row": ["1", "alice"]},
                {"op": 3, "row": ["1", null]}
            ]}
        }"#;

        let page: ResultPage = serde_json::from_str(json).unwrap();
        assert_eq!(
            page.next_link(),
            Some("https://flink.example/statements/s1/results?page_token=ABC123")
        );
        assert_eq!(page.results.data.len(), 2);
        assert_eq!(page.results.data[1].op, Operation::Delete);
        assert_eq!(page.results.data[1].row[1], json!(null));
    }

    #[test]
    fn test_result_page_without_next() {
        let page: ResultPage = serde_json::from_str(r#"{"metadata": {}, "results": {"data": []}}"#).unwrap();
        assert_eq!(page.next_link(), None);
    }

    #[test_case(0, "+I" ; "insert")]
    #[test_case(1, "-U" ; "update before")]
    #[test_case(2, "+U" ; "update after")]
    #[test_case(3, "-D" ; "delete")]
    fn test_operation_codes(code: u8, display: &str) {
        let op = Operation::try_from(code).unwrap();
        assert_eq!(op.to_string(), display);
        assert_eq!(u8::from(op), code);
    }

    #[test]
    fn test_operation_invalid_code() {
        let result: Result<ResultItem, _> = serde_json::from_str(r#"{"op": 7, "row": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_exception_list_deserialize() {
        let json = r#"{"data": [{"name": "TableNotFound", "message": "Table 'x' not found"}]}"#;
        let list: ExceptionList = serde_json::from_str(json).unwrap();
        assert_eq!(list.data[0].message, "Table 'x' not found");
    }
}
