//! Session properties.
//!
//! An ordered key/value map paired with an immutable table of defaults. A
//! key with a default can never disappear: deleting it restores the default.
//! Keys under the `client.` namespace never leave the client.

use std::collections::BTreeMap;

/// Catalog used to resolve unqualified table names.
pub const KEY_CATALOG: &str = "sql.current-catalog";
/// Database used to resolve unqualified table names.
pub const KEY_DATABASE: &str = "sql.current-database";
/// Session time zone.
pub const KEY_LOCAL_TIME_ZONE: &str = "sql.local-time-zone";
/// How long to wait for a pending statement, in milliseconds.
pub const KEY_RESULTS_TIMEOUT: &str = "client.results-timeout";
/// Principal to run statements as instead of the user.
pub const KEY_SERVICE_ACCOUNT: &str = "client.service-account";
/// Name for the next submitted statement; consumed by the submission.
pub const KEY_STATEMENT_NAME: &str = "client.statement-name";

/// Namespace of session-local keys.
pub const LOCAL_NAMESPACE: &str = "client.";

const HIDDEN_VALUE: &str = "<hidden>";
const UNSET_VALUE: &str = "<unset>";

/// Session property map with defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProperties {
    defaults: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
}

impl SessionProperties {
    /// Create the properties of a new session as `defaults ∪ initial`.
    ///
    /// Initial values override defaults; the defaults table itself is kept
    /// unchanged for the lifetime of the session.
    #[must_use]
    pub fn new(defaults: BTreeMap<String, String>, initial: BTreeMap<String, String>) -> Self {
        let mut properties = defaults.clone();
        properties.extend(initial);
        Self {
            defaults,
            properties,
        }
    }

    /// Get the value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Get the value of a key, or `fallback` when it is not set.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    /// Check whether a key is present.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Get the default value of a key, if it has one.
    #[must_use]
    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.defaults.get(key).map(String::as_str)
    }

    /// Set a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Delete a key, restoring its default when it has one.
    pub fn delete(&mut self, key: &str) {
        match self.defaults.get(key) {
            Some(default) => {
                self.properties.insert(key.to_string(), default.clone());
            }
            None => {
                self.properties.remove(key);
            }
        }
    }

    /// Drop every non-default key and restore all defaults.
    pub fn clear(&mut self) {
        self.properties.clone_from(&self.defaults);
    }

    /// Number of keys currently present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over all keys in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Properties forwarded to the statement service.
    #[must_use]
    pub fn non_local_properties(&self) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .filter(|(k, _)| !k.starts_with(LOCAL_NAMESPACE))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// All properties as sorted `[key, value]` rows for display.
    ///
    /// Secret-like values are masked. With `annotate_defaults`, a value equal
    /// to its default is suffixed with ` (default)`.
    #[must_use]
    pub fn to_sorted_rows(&self, annotate_defaults: bool) -> Vec<[String; 2]> {
        self.properties
            .keys()
            .map(|key| [key.clone(), self.display_value(key, annotate_defaults)])
            .collect()
    }

    /// Display form of a single key's value.
    #[must_use]
    pub fn display_value(&self, key: &str, annotate_default: bool) -> String {
        let Some(value) = self.get(key) else {
            return UNSET_VALUE.to_string();
        };
        let mut shown = if is_secret_key(key) && !value.is_empty() {
            HIDDEN_VALUE.to_string()
        } else if value.is_empty() {
            UNSET_VALUE.to_string()
        } else {
            value.to_string()
        };
        if annotate_default && self.default_value(key) == Some(value) {
            shown.push_str(" (default)");
        }
        shown
    }
}

/// Whether a key names a credential that must not be echoed.
///
/// A key is secret-like when one of its dot-separated segments contains the
/// letters of `secret` in order, ignoring case (`sql.secrets.openai`,
/// `client-secret`, `mySecretKey`).
#[must_use]
pub fn is_secret_key(key: &str) -> bool {
    key.split('.')
        .any(|segment| fuzzy_contains("secret", &segment.to_ascii_lowercase()))
}

/// Whether every character of `needle` occurs in `haystack` in order.
fn fuzzy_contains(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}
