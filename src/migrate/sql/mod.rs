//! Single-table `INSERT ... VALUES` dumps.
//!
//! A dump may contain several statements. Each statement is located by its
//! header, its value list is handed to the tuple scanner, and scanning resumes
//! after the bytes the scanner consumed so that text inside literals is never
//! mistaken for another header.

mod tokenizer;

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, warn};

pub use tokenizer::{RowTuple, scan_values};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<RowTuple>,
}

/// A row tuple paired with its statement's column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRow {
    pub table: String,
    fields: Vec<(String, Option<String>)>,
}

impl SqlRow {
    pub fn new(table: &str, fields: Vec<(String, Option<String>)>) -> Self {
        Self {
            table: table.to_string(),
            fields,
        }
    }

    /// Non-null value of `column`, matched case-insensitively.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(column))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PairedRows {
    pub rows: Vec<SqlRow>,
    pub rejected: usize,
}

struct HeaderParser {
    insert_into: Regex,
    table_name: Regex,
    values_keyword: Regex,
}

impl HeaderParser {
    fn new() -> Result<Self> {
        Ok(Self {
            insert_into: Regex::new(r"(?i)\bINSERT\s+INTO\s+")
                .context("failed to compile INSERT INTO regex")?,
            table_name: Regex::new(
                r#"^(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+))*"#,
            )
            .context("failed to compile table name regex")?,
            values_keyword: Regex::new(r"(?i)^\s*VALUES\b")
                .context("failed to compile VALUES keyword regex")?,
        })
    }
}

/// Parses every INSERT statement in `dump`, keeping those whose table matches
/// `table_filter` (by full or unqualified name) when one is given.
pub fn parse_insert_statements(
    dump: &str,
    table_filter: Option<&str>,
) -> Result<Vec<InsertStatement>> {
    let parser = HeaderParser::new()?;
    let mut statements = Vec::new();
    let mut cursor = 0usize;
    let mut headers_seen = 0usize;

    while let Some(found) = parser.insert_into.find(&dump[cursor..]) {
        headers_seen += 1;
        let header_start = cursor + found.start();
        let mut position = cursor + found.end();

        let table_match = parser
            .table_name
            .find(&dump[position..])
            .with_context(|| format!("missing table name after INSERT INTO at byte {header_start}"))?;
        let table = normalize_identifier(table_match.as_str());
        position += table_match.end();

        let rest = dump[position..].trim_start();
        position = dump.len() - rest.len();
        if !rest.starts_with('(') {
            if parser.values_keyword.is_match(rest) {
                bail!("missing column list in INSERT INTO {table}");
            }
            bail!("missing VALUES keyword in INSERT INTO {table}");
        }

        let close = rest
            .find(')')
            .with_context(|| format!("unterminated column list in INSERT INTO {table}"))?;
        let columns = parse_column_list(&rest[1..close])
            .with_context(|| format!("invalid column list in INSERT INTO {table}"))?;
        position += close + 1;

        let values = parser
            .values_keyword
            .find(&dump[position..])
            .with_context(|| format!("missing VALUES keyword in INSERT INTO {table}"))?;
        position += values.end();

        let scan = scan_values(&dump[position..])
            .with_context(|| format!("failed to scan values of INSERT INTO {table}"))?;
        cursor = position + scan.consumed;

        if scan.rows.is_empty() {
            bail!("no rows found in INSERT INTO {table}");
        }

        if !table_matches(&table, table_filter) {
            debug!(table = %table, rows = scan.rows.len(), "skipping statement for other table");
            continue;
        }

        statements.push(InsertStatement {
            table,
            columns,
            rows: scan.rows,
        });
    }

    if headers_seen == 0 {
        bail!("no INSERT INTO statement found");
    }
    if statements.is_empty() {
        bail!(
            "no rows found for table {}",
            table_filter.unwrap_or("<any>")
        );
    }

    Ok(statements)
}

/// Pairs each tuple with the statement's columns; tuples whose arity differs
/// from the header are rejected.
pub fn pair_rows(statements: &[InsertStatement]) -> PairedRows {
    let mut paired = PairedRows::default();

    for statement in statements {
        for (index, tuple) in statement.rows.iter().enumerate() {
            if tuple.len() != statement.columns.len() {
                warn!(
                    table = %statement.table,
                    row = index + 1,
                    expected = statement.columns.len(),
                    found = tuple.len(),
                    "rejecting row with mismatched arity"
                );
                paired.rejected += 1;
                continue;
            }

            let fields = statement
                .columns
                .iter()
                .cloned()
                .zip(tuple.iter().cloned())
                .collect();
            paired.rows.push(SqlRow::new(&statement.table, fields));
        }
    }

    paired
}

/// Groups `(post_id, meta_key, meta_value)` rows by post id, preserving order.
pub fn collect_post_metadata(rows: &[SqlRow]) -> HashMap<String, Vec<(String, String)>> {
    let mut metadata: HashMap<String, Vec<(String, String)>> = HashMap::new();

    for row in rows {
        let (Some(post_id), Some(key)) = (row.get("post_id"), row.get("meta_key")) else {
            continue;
        };
        let value = row.get("meta_value").unwrap_or_default();
        metadata
            .entry(post_id.to_string())
            .or_default()
            .push((key.to_string(), value.to_string()));
    }

    metadata
}

fn parse_column_list(raw: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for part in raw.split(',') {
        let name = normalize_identifier(part);
        if name.is_empty() {
            bail!("empty column name");
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            bail!("duplicate column {name}");
        }
        columns.push(name);
    }

    Ok(columns)
}

fn normalize_identifier(raw: &str) -> String {
    raw.split('.')
        .map(|segment| {
            segment
                .trim()
                .trim_matches(|ch| matches!(ch, '"' | '`' | '[' | ']'))
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn table_matches(table: &str, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let filter = normalize_identifier(filter);
    let unqualified = table.rsplit('.').next().unwrap_or(table);
    table.eq_ignore_ascii_case(&filter) || unqualified.eq_ignore_ascii_case(&filter)
}
