pub mod rewrite;
pub mod sql;
pub mod status;
pub mod wxr;

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::RewriteRuleArgs;
use crate::migrate::links::LinkRewriter;
use crate::migrate::merge::{PostsPolicy, load_document, merge_document, write_document};
use crate::migrate::pipeline::MigrationOutput;
use crate::model::CanonicalDocument;

fn build_rewriter(args: &RewriteRuleArgs) -> Result<LinkRewriter> {
    LinkRewriter::new(&args.legacy_upload_host, &args.media_base_url)
}

/// Reads the destination, merges the run's sections into it and writes the
/// whole document back. Nothing is written on dry runs.
fn commit(
    output: &MigrationOutput,
    destination: &Path,
    policy: PostsPolicy,
    dry_run: bool,
) -> Result<CanonicalDocument> {
    let existing = load_document(destination)?;
    let merged = merge_document(existing, &output.update, policy)?;

    if dry_run {
        info!(path = %destination.display(), "dry run, document not written");
    } else {
        write_document(destination, &merged)?;
        info!(path = %destination.display(), policy = policy.as_str(), "wrote canonical document");
    }

    print_summary(destination, &merged, dry_run);
    Ok(merged)
}

fn print_summary(destination: &Path, document: &CanonicalDocument, dry_run: bool) {
    let verb = if dry_run { "Would write" } else { "Wrote" };
    println!("{verb} {}:", destination.display());
    for (section, count) in document.section_counts() {
        println!("  {section:<14} {count:>6}");
    }
}
