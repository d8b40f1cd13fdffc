use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::migrate::merge::load_document;
use crate::model::CanonicalDocument;

pub fn run(args: StatusArgs) -> Result<()> {
    info!(document = %args.document.display(), "status requested");

    if !args.document.exists() {
        warn!(path = %args.document.display(), "canonical document missing");
        return Ok(());
    }

    let document = load_document(&args.document)?;
    for (section, count) in document.section_counts() {
        info!(section, records = count, "section");
        println!("{section:<14} {count:>6}");
    }

    let unillustrated = records_without_image(&document);
    if unillustrated > 0 {
        warn!(records = unillustrated, "posts or pages without an image reference");
    }

    let extra_keys = document.extra.keys().cloned().collect::<Vec<_>>();
    info!(
        pages_present = document.pages.is_some(),
        extra_sections = %extra_keys.join(","),
        "loaded canonical document"
    );

    Ok(())
}

fn records_without_image(document: &CanonicalDocument) -> usize {
    document
        .blog_posts
        .iter()
        .chain(document.pages.iter().flatten())
        .filter(|record| !has_image_reference(record))
        .count()
}

fn has_image_reference(record: &Value) -> bool {
    ["imageUrl", "imageId"].iter().any(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.trim().is_empty())
    })
}
