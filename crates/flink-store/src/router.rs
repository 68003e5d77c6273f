//! Statement classification.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading keyword of a local statement, anchored on a full token.
static LOCAL_KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(SET|USE|RESET|EXIT|QUIT)\b").unwrap_or_else(|_| unreachable!())
});

/// Kind of statement, decided from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    /// `SET` a session property, or list them.
    Set,
    /// `USE` a catalog and/or database.
    Use,
    /// `RESET` one or all session properties.
    Reset,
    /// `EXIT` or `QUIT` the session.
    Exit,
    /// Anything else; executed by the statement service.
    Other,
}

impl StatementType {
    /// Whether statements of this type are handled client-side.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Classify a statement by its leading keyword.
///
/// Matching is case-insensitive and requires the whole leading token, so
/// `SETTINGS` or `user_table` are not local commands.
#[must_use]
pub fn classify(statement: &str) -> StatementType {
    let body = strip_leading_noise(statement);
    let Some(captures) = LOCAL_KEYWORD_REGEX.captures(body) else {
        return StatementType::Other;
    };
    match captures[1].to_ascii_uppercase().as_str() {
        "SET" => StatementType::Set,
        "USE" => StatementType::Use,
        "RESET" => StatementType::Reset,
        "EXIT" | "QUIT" => StatementType::Exit,
        _ => StatementType::Other,
    }
}

/// Skip leading whitespace, `--` line comments and `/* */` block comments.
#[must_use]
pub fn strip_leading_noise(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}
