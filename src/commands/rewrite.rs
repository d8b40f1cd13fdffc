use anyhow::{Result, bail};
use serde_json::Value;
use tracing::info;

use super::{build_rewriter, print_summary};
use crate::cli::RewriteArgs;
use crate::migrate::links::LinkRewriter;
use crate::migrate::merge::{load_document, write_document};
use crate::model::CanonicalDocument;

const TEXT_FIELDS: &[&str] = &["content", "excerpt"];
const URL_FIELDS: &[&str] = &["url", "imageUrl"];

pub fn run(args: RewriteArgs) -> Result<()> {
    if !args.document.exists() {
        bail!("document not found: {}", args.document.display());
    }

    let rewriter = build_rewriter(&args.rewrite)?;
    let mut document = load_document(&args.document)?;
    let changed = rewrite_document(&mut document, &rewriter);

    info!(path = %args.document.display(), records = changed, "applied rewrite rules");

    if args.dry_run || changed == 0 {
        info!(path = %args.document.display(), "document not written");
    } else {
        write_document(&args.document, &document)?;
    }

    print_summary(&args.document, &document, args.dry_run || changed == 0);
    println!("  {:<14} {changed:>6}", "rewritten");
    Ok(())
}

/// Rewrites the text fields of every record in every section; returns how
/// many records changed.
fn rewrite_document(document: &mut CanonicalDocument, rewriter: &LinkRewriter) -> usize {
    let mut changed = 0usize;
    let sections = [
        &mut document.images,
        &mut document.programs,
        &mut document.blog_posts,
        &mut document.news_articles,
        &mut document.announcements,
    ];

    for section in sections {
        changed += rewrite_section(section, rewriter);
    }
    if let Some(pages) = document.pages.as_mut() {
        changed += rewrite_section(pages, rewriter);
    }

    changed
}

fn rewrite_section(records: &mut [Value], rewriter: &LinkRewriter) -> usize {
    let mut changed = 0usize;

    for record in records {
        let text_changed = rewrite_fields(record, TEXT_FIELDS, |text| rewriter.rewrite(text));
        let url_changed = rewrite_fields(record, URL_FIELDS, |url| rewriter.rewrite_url(url));
        if text_changed || url_changed {
            changed += 1;
        }
    }

    changed
}

fn rewrite_fields(record: &mut Value, fields: &[&str], rewrite: impl Fn(&str) -> String) -> bool {
    let mut changed = false;
    for field in fields {
        let Some(Value::String(text)) = record.get_mut(*field) else {
            continue;
        };
        let rewritten = rewrite(text.as_str());
        if rewritten != *text {
            *text = rewritten;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn rewrites_text_fields_across_sections() {
        let rewriter = LinkRewriter::new("www.example.org", "https://media.example.org").unwrap();
        let mut document: CanonicalDocument = serde_json::from_value(json!({
            "images": [{ "id": "a", "url": "https://www.example.org/wp-content/uploads/a.jpg" }],
            "blogPosts": [
                { "id": "1", "content": "Must have completed NYSC." },
                { "id": "2", "content": "Nothing to change.", "imageUrl": "/uploads/nysc-camp.jpg" }
            ],
            "pages": [{ "id": "p", "excerpt": "Open to NYSC members" }]
        }))
        .unwrap();

        assert_eq!(rewrite_document(&mut document, &rewriter), 3);
        assert_eq!(
            document.images[0]["url"],
            "https://media.example.org/wp-content/uploads/a.jpg"
        );
        assert_eq!(document.blog_posts[0]["content"], ".");
        assert_eq!(document.blog_posts[1]["content"], "Nothing to change.");
        assert_eq!(document.blog_posts[1]["imageUrl"], "/uploads/nysc-camp.jpg");
        assert_eq!(
            document.pages.as_ref().unwrap()[0]["excerpt"],
            "Open to national service members"
        );

        assert_eq!(rewrite_document(&mut document, &rewriter), 0);
    }
}
