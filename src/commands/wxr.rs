use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::{build_rewriter, commit};
use crate::cli::WxrArgs;
use crate::migrate::classify::{WXR_LAYOUT, classify};
use crate::migrate::merge::PostsPolicy;
use crate::migrate::pipeline::Migration;
use crate::migrate::wxr::ItemExtractor;
use crate::util::{read_input_text, sha256_text};

pub fn run(args: WxrArgs) -> Result<()> {
    let document = read_input_text(&args.input)?;
    info!(
        path = %args.input.display(),
        bytes = document.len(),
        sha256 = %sha256_text(&document),
        "loaded interchange export"
    );

    let extractor = ItemExtractor::new()?;
    let items = extractor.extract(&document);
    info!(items = items.len(), "extracted export items");

    let records = items
        .iter()
        .map(|item| classify(item, &WXR_LAYOUT))
        .collect();

    let migration = Migration::new(
        build_rewriter(&args.convert.rewrite)?,
        Utc::now(),
        args.convert.locale,
    )?;
    let output = migration.run(records);

    if output.stats.posts == 0 && output.stats.pages == 0 {
        warn!(items = items.len(), "no published posts or pages found");
        println!(
            "Note: the export appears to contain no posts/pages; existing blogPosts and pages are kept."
        );
    }

    commit(
        &output,
        &args.output,
        PostsPolicy::ReplaceIfNonEmpty,
        args.convert.dry_run,
    )?;
    Ok(())
}
