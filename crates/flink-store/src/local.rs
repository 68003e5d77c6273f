//! Client-side handling of `SET`, `USE` and `RESET`.
//!
//! Each operation mutates the session properties and returns a completed
//! statement with `Key`/`Value` rows. Nothing here touches the network.

use tracing::debug;

use crate::error::StatementError;
use crate::parser::UseTarget;
use crate::properties::{
    KEY_CATALOG, KEY_DATABASE, KEY_STATEMENT_NAME, SessionProperties, is_secret_key,
};
use crate::statement::{ProcessedStatement, StatementKind, StatementResults};

const USE_CATALOG_HINT: &str = "run USE CATALOG `my_catalog` to select a catalog";

/// Apply a parsed `SET`.
///
/// `None` lists the current properties.
pub fn process_set(
    properties: &mut SessionProperties,
    statement: &str,
    pair: Option<(String, String)>,
) -> Result<ProcessedStatement, StatementError> {
    let Some((key, value)) = pair else {
        return Ok(list_properties(properties, StatementKind::Set, statement, ""));
    };

    if key == KEY_CATALOG || key == KEY_DATABASE {
        return Err(
            StatementError::config("catalog and database can't be changed with SET").with_suggestion(
                "run USE CATALOG `my_catalog` to select a catalog or USE `my_database` to select a database",
            ),
        );
    }
    if key == KEY_STATEMENT_NAME && value.trim().is_empty() {
        return Err(StatementError::config("statement name can't be empty")
            .with_suggestion(format!("run SET '{KEY_STATEMENT_NAME}'='my-statement'")));
    }

    let sensitive = is_secret_key(&key);
    properties.set(key.as_str(), value);
    debug!(key = %key, sensitive, "session property set");

    let row = [key.clone(), properties.display_value(&key, false)];
    Ok(ProcessedStatement::local(
        StatementKind::Set,
        statement,
        StatementResults::key_value([row]),
        "configuration updated successfully",
    )
    .sensitive(sensitive))
}

/// Apply a parsed `USE`.
pub fn process_use(
    properties: &mut SessionProperties,
    statement: &str,
    target: UseTarget,
) -> Result<ProcessedStatement, StatementError> {
    let rows = match target {
        UseTarget::Database(database) => {
            if properties.get(KEY_CATALOG).is_none_or(str::is_empty) {
                return Err(StatementError::config("no catalog was set").with_suggestion(USE_CATALOG_HINT));
            }
            properties.set(KEY_DATABASE, database);
            vec![row(properties, KEY_DATABASE)]
        }
        UseTarget::Catalog(catalog) => {
            properties.set(KEY_CATALOG, catalog);
            properties.delete(KEY_DATABASE);
            vec![row(properties, KEY_CATALOG)]
        }
        UseTarget::CatalogAndDatabase(catalog, database) => {
            properties.set(KEY_CATALOG, catalog);
            properties.set(KEY_DATABASE, database);
            vec![row(properties, KEY_CATALOG), row(properties, KEY_DATABASE)]
        }
    };
    debug!(
        catalog = properties.get_or(KEY_CATALOG, ""),
        database = properties.get_or(KEY_DATABASE, ""),
        "session namespace changed"
    );

    Ok(ProcessedStatement::local(
        StatementKind::Use,
        statement,
        StatementResults::key_value(rows),
        "configuration updated successfully",
    ))
}

/// Apply a parsed `RESET`.
///
/// `None` restores the defaults and lists the result.
pub fn process_reset(
    properties: &mut SessionProperties,
    statement: &str,
    key: Option<String>,
) -> Result<ProcessedStatement, StatementError> {
    let Some(key) = key else {
        properties.clear();
        debug!("session properties reset");
        return Ok(list_properties(
            properties,
            StatementKind::Reset,
            statement,
            "configuration has been reset successfully",
        ));
    };

    if !properties.has_key(&key) {
        return Err(StatementError::config(format!(
            "configuration key \"{key}\" is not set"
        )));
    }

    properties.delete(&key);
    let mut rows = vec![row(properties, &key)];
    if key == KEY_CATALOG {
        properties.delete(KEY_DATABASE);
        rows.push(row(properties, KEY_DATABASE));
    }
    debug!(key = %key, "session property reset");

    Ok(ProcessedStatement::local(
        StatementKind::Reset,
        statement,
        StatementResults::key_value(rows),
        format!("configuration key \"{key}\" has been reset successfully"),
    ))
}

fn row(properties: &SessionProperties, key: &str) -> [String; 2] {
    [key.to_string(), properties.display_value(key, false)]
}

fn list_properties(
    properties: &SessionProperties,
    kind: StatementKind,
    statement: &str,
    detail: &str,
) -> ProcessedStatement {
    ProcessedStatement::local(
        kind,
        statement,
        StatementResults::key_value(properties.to_sorted_rows(true)),
        detail,
    )
}
