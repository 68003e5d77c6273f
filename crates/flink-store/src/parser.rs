//! Parsing of the local `SET`, `USE` and `RESET` commands.
//!
//! Keywords are case-insensitive; keys, values and identifiers keep their
//! case. Keys and values are single-quoted with `''` as the escape for a
//! literal quote. Identifiers in `USE` are optionally backtick-quoted with
//! ` `` ` as the escape for a literal backtick. One or more trailing `;` are
//! ignored.

use crate::error::StatementError;
use crate::router::strip_leading_noise;

const SET_USAGE: &[&str] = &["SET 'key'='value'", "SET"];
const USE_USAGE: &[&str] = &[
    "USE CATALOG `my_catalog`",
    "USE `my_database`",
    "USE `my_catalog`.`my_database`",
];
const RESET_USAGE: &[&str] = &["RESET 'key'", "RESET"];

/// Target of a `USE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseTarget {
    /// `USE CATALOG c`
    Catalog(String),
    /// `USE d`
    Database(String),
    /// `` USE `c`.`d` ``
    CatalogAndDatabase(String, String),
}

/// Parse a `SET` statement.
///
/// Returns `None` for a bare `SET`, which lists the session properties.
pub fn parse_set(statement: &str) -> Result<Option<(String, String)>, StatementError> {
    let body = command_body(statement, "SET", SET_USAGE)?;
    if body.is_empty() {
        return Ok(None);
    }

    let mut separators = unquoted_positions(body, '=');
    let Some(eq) = separators.next() else {
        return Err(StatementError::syntax("missing \"=\"", SET_USAGE));
    };
    if separators.next().is_some() {
        return Err(StatementError::syntax(
            "too many unescaped \"=\"; quote keys and values with ''",
            SET_USAGE,
        ));
    }

    let raw_key = body[..eq].trim();
    let raw_value = body[eq + 1..].trim();
    if raw_key.is_empty() {
        return Err(StatementError::syntax("key can't be empty", SET_USAGE));
    }
    if raw_value.is_empty() {
        return Err(StatementError::syntax(
            format!("value for key {raw_key} can't be empty"),
            SET_USAGE,
        ));
    }

    let key = unquote_literal(raw_key, "key", SET_USAGE).map_err(|e| {
        e.with_suggestion(format!(
            "if you want to set {raw_key} you can run SET '{}'='{}'",
            escape_literal(raw_key.trim_matches('\'')),
            escape_literal(raw_value.trim_matches('\''))
        ))
    })?;
    if key.is_empty() {
        return Err(StatementError::syntax("key can't be empty", SET_USAGE));
    }
    let value = unquote_literal(raw_value, "value", SET_USAGE)?;

    Ok(Some((key, value)))
}

/// Parse a `RESET` statement.
///
/// Returns `None` for a bare `RESET`, which resets every property.
pub fn parse_reset(statement: &str) -> Result<Option<String>, StatementError> {
    let body = command_body(statement, "RESET", RESET_USAGE)?;
    if body.is_empty() {
        return Ok(None);
    }

    let key = unquote_literal(body, "key", RESET_USAGE)
        .map_err(|e| e.with_suggestion(format!("RESET '{}'", escape_literal(body.trim_matches('\'')))))?;
    if key.is_empty() {
        return Err(StatementError::syntax("key can't be empty", RESET_USAGE));
    }
    Ok(Some(key))
}

/// Parse a `USE` statement.
pub fn parse_use(statement: &str) -> Result<UseTarget, StatementError> {
    let body = command_body(statement, "USE", USE_USAGE)?;
    if body.is_empty() {
        return Err(StatementError::syntax(
            "missing catalog or database name",
            USE_USAGE,
        ));
    }

    if let Some(rest) = strip_catalog_keyword(body) {
        let (catalog, rest) = identifier(rest)?;
        if !rest.trim().is_empty() {
            return Err(StatementError::syntax(
                "unexpected input after catalog name",
                USE_USAGE,
            ));
        }
        return Ok(UseTarget::Catalog(catalog));
    }

    let (first, rest) = identifier(body)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Ok(UseTarget::Database(first));
    }
    let Some(rest) = rest.strip_prefix('.') else {
        return Err(StatementError::syntax(
            "unexpected input after database name",
            USE_USAGE,
        ));
    };
    let rest = rest.trim_start();
    let (second, tail) = identifier(rest)?;
    if !tail.trim().is_empty() {
        return Err(StatementError::syntax(
            "unexpected input after database name",
            USE_USAGE,
        ));
    }
    if !body.starts_with('`') || !rest.starts_with('`') {
        return Err(StatementError::syntax(
            "catalog and database must be enclosed in backticks",
            USE_USAGE,
        )
        .with_suggestion(format!(
            "USE `{}`.`{}`",
            escape_identifier(&first),
            escape_identifier(&second)
        )));
    }
    Ok(UseTarget::CatalogAndDatabase(first, second))
}

/// Remove one or more trailing `;` and surrounding whitespace.
#[must_use]
pub fn remove_statement_terminator(statement: &str) -> &str {
    statement.trim().trim_end_matches(';').trim_end()
}

/// Body of a command after its keyword, trimmed.
fn command_body<'a>(
    statement: &'a str,
    keyword: &str,
    usage: &[&str],
) -> Result<&'a str, StatementError> {
    let statement = remove_statement_terminator(strip_leading_noise(statement));
    let head = statement.get(..keyword.len());
    let rest = statement.get(keyword.len()..).unwrap_or("");
    let starts_with_token = head.is_some_and(|h| h.eq_ignore_ascii_case(keyword))
        && rest
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
    if !starts_with_token {
        return Err(StatementError::syntax(
            format!("expected a {keyword} statement"),
            usage,
        ));
    }
    Ok(rest.trim())
}

/// Byte positions of `target` that are outside single-quoted literals.
///
/// An escaped `''` inside a literal toggles the quote state twice, so it
/// never ends the literal.
fn unquoted_positions(input: &str, target: char) -> impl Iterator<Item = usize> + '_ {
    let mut in_quote = false;
    input.char_indices().filter_map(move |(i, c)| {
        if c == '\'' {
            in_quote = !in_quote;
            None
        } else if c == target && !in_quote {
            Some(i)
        } else {
            None
        }
    })
}

/// Strip the enclosing single quotes of a literal and unescape `''`.
fn unquote_literal(raw: &str, what: &str, usage: &[&str]) -> Result<String, StatementError> {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .filter(|_| raw.len() >= 2);
    let Some(inner) = inner else {
        return Err(StatementError::syntax(
            format!("{what} must be enclosed by single quotes ''"),
            usage,
        ));
    };
    if inner.replace("''", "").contains('\'') {
        return Err(StatementError::syntax(
            format!("{what} contains an unescaped single quote; escape it as ''"),
            usage,
        ));
    }
    Ok(inner.replace("''", "'"))
}

/// Escape single quotes for display in a suggestion.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Escape backticks for display in a suggestion.
fn escape_identifier(value: &str) -> String {
    value.replace('`', "``")
}

/// If `body` starts with the `CATALOG` keyword followed by more input,
/// return that input.
fn strip_catalog_keyword(body: &str) -> Option<&str> {
    let (head, rest) = body.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    (head.eq_ignore_ascii_case("CATALOG") && !rest.is_empty()).then_some(rest)
}

/// Read one identifier from the start of `input`.
///
/// Returns the identifier and the unconsumed remainder.
fn identifier(input: &str) -> Result<(String, &str), StatementError> {
    if let Some(quoted) = input.strip_prefix('`') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '`' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '`'))) {
                chars.next();
                name.push('`');
                continue;
            }
            if name.is_empty() {
                return Err(StatementError::syntax("identifier can't be empty", USE_USAGE));
            }
            return Ok((name, &quoted[i + 1..]));
        }
        return Err(StatementError::syntax(
            "unterminated backtick-quoted identifier",
            USE_USAGE,
        ));
    }

    let end = input
        .find(|c: char| c.is_whitespace() || c == '.' || c == '`')
        .unwrap_or(input.len());
    if end == 0 {
        return Err(StatementError::syntax(
            "missing catalog or database name",
            USE_USAGE,
        ));
    }
    Ok((input[..end].to_string(), &input[end..]))
}
