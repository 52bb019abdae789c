//! SQL text helpers: quoting and the queries the workbench generates itself

use std::path::Path;

use crate::error::{WorkbenchError, WorkbenchResult};

/// Quote an identifier with double quotes, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a literal: finite numbers are emitted as-is, everything else as a
/// single-quoted string with embedded quotes doubled
pub fn quote_literal(value: &str) -> String {
    if value.parse::<f64>().is_ok_and(|n| n.is_finite()) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape LIKE wildcards so the value matches literally (used with `ESCAPE '\'`)
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Build a LIKE pattern literal, e.g. `'%abc%'`
pub fn like_pattern(prefix: &str, value: &str, suffix: &str) -> String {
    format!("'{}{}{}'", prefix, escape_like(value).replace('\'', "''"), suffix)
}

/// Generate the preview query for a table or view.
///
/// The schema qualifier is left out when it is empty or the default schema.
pub fn select_for_object(schema: &str, name: &str, default_schema: &str, limit: usize) -> String {
    let qualifier = if schema.is_empty() || schema == default_schema {
        String::new()
    } else {
        format!("{}.", quote_identifier(schema))
    };
    format!(
        "SELECT *\nFROM {}{}\nLIMIT {};",
        qualifier,
        quote_identifier(name),
        limit
    )
}

/// Wrap a base query so a WHERE clause can be applied to its output.
///
/// The base sits on its own lines so a trailing `--` comment cannot swallow
/// the closing parenthesis.
pub fn compose_filtered_query(base: &str, where_clause: &str) -> String {
    let base = base.trim().trim_end_matches(';').trim_end();
    format!("SELECT * FROM (\n{}\n) AS filtered_result WHERE {}", base, where_clause)
}

const FALLBACK_TABLE_NAME: &str = "new_table";
const MAX_TABLE_NAME_LEN: usize = 60;

/// Table name suggested when loading a data file.
///
/// Takes the file name without its last extension, replaces everything but
/// ASCII letters, digits and `_` with `_`, and keeps the first 60
/// characters. A file with no extension or an empty stem gets `new_table`.
pub fn suggest_table_name(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => FALLBACK_TABLE_NAME,
    };
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .take(MAX_TABLE_NAME_LEN)
        .collect()
}

/// Trim a user-entered table name, rejecting blank input
pub fn validate_table_name(name: &str) -> WorkbenchResult<String> {
    match name.trim() {
        "" => Err(WorkbenchError::BlankTableName),
        trimmed => Ok(trimmed.to_string()),
    }
}

/// First 100 characters of a query, for log fields
pub(crate) fn preview(sql: &str) -> String {
    sql.chars().take(100).collect()
}
