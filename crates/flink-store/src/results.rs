//! Conversion of raw result pages into [`StatementResults`].

use flink_proto::{DataType, ResultItem, ResultSchema};
use serde_json::Value;
use url::Url;

use crate::error::StatementError;
use crate::statement::{Field, ResultRow, StatementResults};

const PAGE_TOKEN_PARAM: &str = "page_token";

/// Convert raw rows using the declared schema.
///
/// Without a schema, value shapes are inferred from the JSON.
pub fn convert_results(
    items: &[ResultItem],
    schema: Option<&ResultSchema>,
) -> Result<StatementResults, StatementError> {
    let headers = schema.map(ResultSchema::column_names).unwrap_or_default();
    let rows = items
        .iter()
        .enumerate()
        .map(|(index, item)| convert_row(index, item, schema))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StatementResults { headers, rows })
}

fn convert_row(
    index: usize,
    item: &ResultItem,
    schema: Option<&ResultSchema>,
) -> Result<ResultRow, StatementError> {
    let fields = match schema {
        Some(schema) => {
            if schema.columns.len() != item.row.len() {
                return Err(StatementError::ResultConversion(format!(
                    "row {index} has {} values but the schema declares {} columns",
                    item.row.len(),
                    schema.columns.len()
                )));
            }
            item.row
                .iter()
                .zip(&schema.columns)
                .map(|(value, column)| convert_field(value, &column.data_type))
                .collect::<Result<Vec<_>, _>>()?
        }
        None => item.row.iter().map(infer_field).collect(),
    };
    Ok(ResultRow {
        operation: item.op,
        fields,
    })
}

/// Convert one value of the given type.
pub fn convert_field(value: &Value, data_type: &DataType) -> Result<Field, StatementError> {
    if value.is_null() {
        return Ok(Field::Null);
    }

    match data_type.type_name.as_str() {
        "ARRAY" | "MULTISET" => {
            let element_type = nested_type(data_type.element_type.as_deref(), data_type, "element")?;
            let items = expect_array(value, data_type)?;
            items
                .iter()
                .map(|v| convert_field(v, element_type))
                .collect::<Result<Vec<_>, _>>()
                .map(Field::Array)
        }
        "MAP" => {
            let key_type = nested_type(data_type.key_type.as_deref(), data_type, "key")?;
            let value_type = nested_type(data_type.value_type.as_deref(), data_type, "value")?;
            match value {
                Value::Object(entries) => entries
                    .iter()
                    .map(|(k, v)| -> Result<(Field, Field), StatementError> {
                        Ok((Field::varchar(k.clone()), convert_field(v, value_type)?))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Field::Map),
                _ => expect_array(value, data_type)?
                    .iter()
                    .map(|entry| -> Result<(Field, Field), StatementError> {
                        match entry.as_array().map(Vec::as_slice) {
                            Some([k, v]) => Ok((convert_field(k, key_type)?, convert_field(v, value_type)?)),
                            _ => Err(StatementError::ResultConversion(format!(
                                "MAP entry is not a [key, value] pair: {entry}"
                            ))),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Field::Map),
            }
        }
        "ROW" | "STRUCTURED_TYPE" => {
            let values = expect_array(value, data_type)?;
            if values.len() != data_type.fields.len() {
                return Err(StatementError::ResultConversion(format!(
                    "ROW value has {} fields but the type declares {}",
                    values.len(),
                    data_type.fields.len()
                )));
            }
            values
                .iter()
                .zip(&data_type.fields)
                .map(|(v, field)| convert_field(v, &field.field_type))
                .collect::<Result<Vec<_>, _>>()
                .map(Field::Row)
        }
        type_name => Ok(Field::Atomic {
            value: atomic_string(value),
            data_type: type_name.to_string(),
        }),
    }
}

fn nested_type<'a>(
    nested: Option<&'a DataType>,
    parent: &DataType,
    role: &str,
) -> Result<&'a DataType, StatementError> {
    nested.ok_or_else(|| {
        StatementError::ResultConversion(format!("{} type is missing its {role} type", parent.type_name))
    })
}

fn expect_array<'a>(value: &'a Value, data_type: &DataType) -> Result<&'a Vec<Value>, StatementError> {
    value.as_array().ok_or_else(|| {
        StatementError::ResultConversion(format!(
            "expected a JSON array for {} but got {value}",
            data_type.type_name
        ))
    })
}

fn infer_field(value: &Value) -> Field {
    match value {
        Value::Null => Field::Null,
        Value::Array(items) => Field::Array(items.iter().map(infer_field).collect()),
        Value::Object(entries) => Field::Map(
            entries
                .iter()
                .map(|(k, v)| (Field::varchar(k.clone()), infer_field(v)))
                .collect(),
        ),
        other => Field::varchar(atomic_string(other)),
    }
}

fn atomic_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract the page token from a "next" link.
///
/// An absent or unparsable link, or one without a `page_token` parameter,
/// yields an empty token, meaning there are no more pages.
#[must_use]
pub fn extract_page_token(next: Option<&str>) -> String {
    let Some(link) = next.map(str::trim).filter(|l| !l.is_empty()) else {
        return String::new();
    };
    let parsed = Url::parse(link).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(link))
    });
    let Ok(url) = parsed else {
        return String::new();
    };
    url.query_pairs()
        .find(|(k, _)| k == PAGE_TOKEN_PARAM)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
