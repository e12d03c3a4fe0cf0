//! Identifier sanitization for column and table names.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Placeholder used when a column name sanitizes to nothing.
pub const COLUMN_PLACEHOLDER: &str = "col";
/// Placeholder used when an object name sanitizes to nothing.
pub const TABLE_PLACEHOLDER: &str = "data";

static INVALID_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

/// Sanitize a column name into `[A-Za-z_][A-Za-z0-9_]*`.
///
/// Runs of other characters become one underscore, leading and trailing underscores are
/// trimmed, an empty result becomes `col`, and a leading digit gets an underscore prefix.
/// Sanitizing a sanitized name returns it unchanged.
#[must_use]
pub fn sanitize_identifier(raw: &str) -> String {
    sanitize_with_placeholder(raw, COLUMN_PLACEHOLDER)
}

/// [`sanitize_identifier`] with a custom placeholder for empty results.
#[must_use]
pub fn sanitize_with_placeholder(raw: &str, placeholder: &str) -> String {
    let replaced = INVALID_RUN_RE.replace_all(raw, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        return placeholder.to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
        trimmed.to_string()
    } else {
        format!("_{trimmed}")
    }
}

/// Disambiguate repeated names by appending `_2`, `_3`, ... to later occurrences.
///
/// The first occurrence keeps its name and order is preserved.
#[must_use]
pub fn dedupe_identifiers(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let unique = if seen.contains(&name) {
            let mut n = 2usize;
            loop {
                let candidate = format!("{name}_{n}");
                if !seen.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            }
        } else {
            name.clone()
        };
        if unique != name {
            log::warn!("Duplicate column name '{name}' renamed to '{unique}'");
        }
        seen.insert(unique.clone());
        out.push(unique);
    }
    out
}

/// Derive a destination table name from an object path.
///
/// Takes the last path segment, drops its extension, sanitizes it (falling back to `data`)
/// and prepends `prefix`.
#[must_use]
pub fn table_name_for_object(path: &str, prefix: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    format!("{prefix}{}", sanitize_with_placeholder(stem, TABLE_PLACEHOLDER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Order ID"), "Order_ID");
        assert_eq!(sanitize_identifier("  price ($) "), "price");
        assert_eq!(sanitize_identifier("a--b__c"), "a_b__c");
        assert_eq!(sanitize_identifier("2nd"), "_2nd");
        assert_eq!(sanitize_identifier("__x__"), "x");
        assert_eq!(sanitize_identifier("???"), "col");
        assert_eq!(sanitize_identifier("_"), "col");
        assert_eq!(sanitize_identifier("naïve"), "na_ve");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["Order ID", "2nd", "???", "x", "_9lives", "a__b", "é", "col_1"] {
            let once = sanitize_identifier(raw);
            assert_eq!(sanitize_identifier(&once), once, "{raw}");
        }
    }

    #[test]
    fn test_dedupe_identifiers() {
        let names = ["a", "b", "a", "a", "a_2"].map(String::from).to_vec();
        assert_eq!(
            dedupe_identifiers(names),
            vec!["a", "b", "a_2", "a_3", "a_2_2"]
        );
        let unique = ["x", "y"].map(String::from).to_vec();
        assert_eq!(dedupe_identifiers(unique.clone()), unique);
    }

    #[test]
    fn test_table_name_for_object() {
        assert_eq!(
            table_name_for_object("incoming/Sales Report (Q1).csv", "csv_"),
            "csv_Sales_Report_Q1"
        );
        assert_eq!(table_name_for_object("orders.csv", "csv_"), "csv_orders");
        assert_eq!(table_name_for_object("a/b/archive.tar.csv", ""), "archive_tar");
        assert_eq!(table_name_for_object("incoming/.csv", "csv_"), "csv_data");
        assert_eq!(table_name_for_object("incoming/2024.csv", "t_"), "t__2024");
        assert_eq!(table_name_for_object("README", "csv_"), "csv_README");
    }
}
