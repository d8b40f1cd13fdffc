use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;

use super::{build_rewriter, commit};
use crate::cli::SqlArgs;
use crate::migrate::classify::{SQL_LAYOUT, classify};
use crate::migrate::merge::PostsPolicy;
use crate::migrate::pipeline::Migration;
use crate::migrate::sql::{collect_post_metadata, pair_rows, parse_insert_statements};
use crate::model::IntermediateRecord;
use crate::util::{read_input_text, sha256_text};

pub fn run(args: SqlArgs) -> Result<()> {
    let dump = read_input_text(&args.input)?;
    info!(
        path = %args.input.display(),
        bytes = dump.len(),
        sha256 = %sha256_text(&dump),
        "loaded sql dump"
    );

    let records = records_from_dump(&dump, args.table.as_deref())
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    let metadata = match args.postmeta.as_deref() {
        Some(path) => load_post_metadata(path)?,
        None => HashMap::new(),
    };
    let records = attach_metadata(records, &metadata);

    let migration = Migration::new(
        build_rewriter(&args.convert.rewrite)?,
        Utc::now(),
        args.convert.locale,
    )?;
    let output = migration.run(records);

    commit(&output, &args.output, PostsPolicy::Replace, args.convert.dry_run)?;
    Ok(())
}

fn records_from_dump(dump: &str, table: Option<&str>) -> Result<Vec<IntermediateRecord>> {
    let statements = parse_insert_statements(dump, table)?;
    let paired = pair_rows(&statements);
    info!(
        statements = statements.len(),
        rows = paired.rows.len(),
        rejected = paired.rejected,
        "tokenized sql dump"
    );

    if paired.rows.is_empty() {
        bail!("no rows found: every row was rejected");
    }

    Ok(paired
        .rows
        .iter()
        .map(|row| classify(row, &SQL_LAYOUT))
        .collect())
}

fn load_post_metadata(path: &Path) -> Result<HashMap<String, Vec<(String, String)>>> {
    let dump = read_input_text(path)?;
    let statements = parse_insert_statements(&dump, None)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let rows = pair_rows(&statements).rows;
    if let Some(row) = rows.iter().find(|row| !row.has_column("meta_key")) {
        bail!("table {} has no meta_key column in {}", row.table, path.display());
    }
    let metadata = collect_post_metadata(&rows);

    info!(
        path = %path.display(),
        posts = metadata.len(),
        "loaded post metadata"
    );
    Ok(metadata)
}

fn attach_metadata(
    mut records: Vec<IntermediateRecord>,
    metadata: &HashMap<String, Vec<(String, String)>>,
) -> Vec<IntermediateRecord> {
    for record in &mut records {
        if let Some(entries) = record
            .source_id
            .as_deref()
            .and_then(|id| metadata.get(id.trim()))
        {
            record.metadata.extend(entries.iter().cloned());
        }
    }
    records
}
