//! Output formatting for statements and errors.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use flink_store::{ProcessedStatement, StatementError};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Widest cell rendered in a table before truncation.
const MAX_CELL_WIDTH: usize = 64;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for ProcessedStatement {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if !self.is_local_statement() {
            writeln!(writer, "Statement name: {}", self.name())?;
            writeln!(writer, "Statement phase: {}", self.status())?;
        }
        if !self.status_detail().is_empty() {
            writeln!(writer, "{}", self.status_detail())?;
        }

        let results = self.results();
        if results.headers.is_empty() && results.is_empty() {
            return Ok(());
        }

        let show_op = !self.is_local_statement() && !self.is_append_only();
        let mut headers: Vec<String> = Vec::new();
        if show_op {
            headers.push("Op".to_string());
        }
        headers.extend(results.headers.iter().cloned());

        let rows: Vec<Vec<String>> = results
            .rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(headers.len());
                if show_op {
                    cells.push(row.operation.to_string());
                }
                cells.extend(row.fields.iter().map(|f| truncate(&f.to_string(), MAX_CELL_WIDTH)));
                cells
            })
            .collect();

        let columns = rows.iter().map(Vec::len).chain([headers.len()]).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for line in std::iter::once(&headers).chain(&rows) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let border = widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("┼");
        writeln!(writer, "{}", format_line(&headers, &widths))?;
        writeln!(writer, "{border}")?;
        for row in &rows {
            writeln!(writer, "{}", format_line(row, &widths))?;
        }

        writeln!(writer)?;
        let count = results.len();
        if count == 1 {
            writeln!(writer, "1 row")?;
        } else {
            writeln!(writer, "{count} rows")?;
        }
        if self.has_more_pages() {
            writeln!(writer, "(more results available)")?;
        }
        Ok(())
    }
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map_or("", String::as_str);
            format!(" {cell:<width$} ")
        })
        .collect::<Vec<_>>()
        .join("│")
}

/// User-facing rendering of a statement error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Error message.
    pub error: String,
    /// Server-side failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// HTTP-like status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Valid forms of a local command.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usage: Vec<String>,
    /// How to fix the statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&StatementError> for ErrorReport {
    fn from(err: &StatementError) -> Self {
        Self {
            error: err.to_string(),
            detail: err.failure_detail().map(ToString::to_string),
            status_code: err.status_code(),
            usage: err.usage().to_vec(),
            suggestion: err.suggestion().map(ToString::to_string),
        }
    }
}

impl TableDisplay for ErrorReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Error: {}", self.error)?;
        if let Some(detail) = &self.detail {
            writeln!(writer, "{detail}")?;
        }
        if !self.usage.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Usage:")?;
            for line in &self.usage {
                writeln!(writer, "  {line}")?;
            }
        }
        if let Some(suggestion) = &self.suggestion {
            writeln!(writer)?;
            writeln!(writer, "Suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
