use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::cli::Locale;
use crate::migrate::images::{ImageResolver, accepted_url};
use crate::migrate::links::LinkRewriter;
use crate::migrate::merge::SectionUpdate;
use crate::migrate::normalize::Normalizer;
use crate::model::{ImageRecord, IntermediateRecord, RecordKind};

pub const MEDIA_KEY_PREFIX: &str = "wp-media-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub records_seen: usize,
    pub attachments: usize,
    pub posts: usize,
    pub pages: usize,
    pub discarded: usize,
    pub dropped_invalid: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationOutput {
    pub update: SectionUpdate,
    pub stats: MigrationStats,
}

/// Components 3 through 6 of a conversion run, shared by both source formats.
pub struct Migration {
    resolver: ImageResolver,
    rewriter: LinkRewriter,
    normalizer: Normalizer,
}

impl Migration {
    pub fn new(
        rewriter: LinkRewriter,
        now: DateTime<Utc>,
        default_locale: Locale,
    ) -> Result<Self> {
        Ok(Self {
            resolver: ImageResolver::new()?,
            rewriter,
            normalizer: Normalizer::new(now, default_locale),
        })
    }

    pub fn run(&self, records: Vec<IntermediateRecord>) -> MigrationOutput {
        let mut stats = MigrationStats {
            records_seen: records.len(),
            ..MigrationStats::default()
        };
        let mut update = SectionUpdate::default();
        let mut attachment_urls = HashMap::new();
        let mut content = Vec::new();

        for record in records {
            match record.kind {
                RecordKind::Attachment => {
                    let (Some(source_id), Some(raw_url)) =
                        (record.source_id.as_deref(), record.attachment_url.as_deref())
                    else {
                        stats.discarded += 1;
                        continue;
                    };
                    let url = self.rewriter.rewrite_url(raw_url.trim());
                    attachment_urls.insert(source_id.trim().to_string(), url.clone());
                    stats.attachments += 1;

                    if accepted_url(&url).is_none() {
                        debug!(source_id, url = %url, "attachment URL not usable as an image");
                        continue;
                    }
                    let alt = record
                        .title
                        .as_deref()
                        .or(record.slug.as_deref())
                        .unwrap_or_default()
                        .to_string();
                    update.images.push(ImageRecord {
                        id: format!("{MEDIA_KEY_PREFIX}{}", source_id.trim()),
                        url,
                        alt,
                    });
                }
                RecordKind::Post | RecordKind::Page => content.push(record),
                RecordKind::Discard => stats.discarded += 1,
            }
        }

        // attachments may follow the posts that reference them
        for mut record in content {
            let kind = record.kind;
            record.body = self.rewriter.rewrite(&record.body);
            if let Some(excerpt) = record.excerpt.take() {
                record.excerpt = Some(self.rewriter.rewrite(&excerpt));
            }
            if let Some(explicit) = record.image_url.take() {
                record.image_url = Some(self.rewriter.rewrite_url(&explicit));
            }
            self.apply_image(&mut record, &attachment_urls);

            let Some(canonical) = self.normalizer.normalize(record) else {
                debug!(kind = kind.as_str(), "dropped record without id, slug or title");
                stats.dropped_invalid += 1;
                continue;
            };
            match kind {
                RecordKind::Page => {
                    stats.pages += 1;
                    update.pages.push(canonical);
                }
                _ => {
                    stats.posts += 1;
                    update.blog_posts.push(canonical);
                }
            }
        }

        info!(
            records = stats.records_seen,
            attachments = stats.attachments,
            images = update.images.len(),
            posts = stats.posts,
            pages = stats.pages,
            discarded = stats.discarded,
            dropped = stats.dropped_invalid,
            "normalized records"
        );

        MigrationOutput { update, stats }
    }

    /// An explicit image id with no explicit URL is kept as-is; otherwise the
    /// resolved URL replaces it and the body is repaired to show it.
    fn apply_image(&self, record: &mut IntermediateRecord, attachment_urls: &HashMap<String, String>) {
        let explicit_url = record.image_url.as_deref().and_then(accepted_url);
        if explicit_url.is_none() && record.image_id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
            record.image_url = None;
            return;
        }

        let resolved = self.resolver.resolve(record, attachment_urls);
        debug!(
            slug = record.slug.as_deref().unwrap_or_default(),
            source = resolved.source.as_str(),
            url = %resolved.url,
            "resolved representative image"
        );

        let title = record.title.as_deref().unwrap_or_default();
        record.body = self.resolver.repair_content(&record.body, &resolved.url, title);
        record.image_url = Some(resolved.url);
        record.image_id = None;
    }
}
