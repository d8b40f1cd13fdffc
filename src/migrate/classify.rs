//! Turns extracted items and SQL rows into typed intermediate records.

use crate::migrate::sql::SqlRow;
use crate::migrate::wxr::{
    ExtractedItem, TAG_ATTACHMENT_URL, TAG_CATEGORY, TAG_CONTENT, TAG_CREATOR, TAG_EXCERPT,
    TAG_MODIFIED_GMT, TAG_POST_DATE, TAG_POST_DATE_GMT, TAG_POST_ID, TAG_POST_NAME, TAG_POST_TYPE,
    TAG_PUB_DATE, TAG_STATUS, TAG_TITLE,
};
use crate::model::{IntermediateRecord, RecordKind};

pub const DEFAULT_AUTHOR: &str = "Admin";

/// Field access shared by both source formats.
pub trait RecordSource {
    /// First non-empty value under any of `names`, tried in order.
    fn value(&self, names: &[&str]) -> Option<String>;

    /// Every value under any of `names`.
    fn values(&self, names: &[&str]) -> Vec<String>;

    fn metadata(&self) -> Vec<(String, String)>;
}

impl RecordSource for ExtractedItem {
    fn value(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.first(name))
            .find(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }

    fn values(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .flat_map(|name| self.all(name))
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        self.metadata.clone()
    }
}

impl RecordSource for SqlRow {
    fn value(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }

    /// Comma-separated list columns are split into their labels.
    fn values(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    fn metadata(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Which source names feed each intermediate field.
#[derive(Debug)]
pub struct FieldLayout {
    pub id: &'static [&'static str],
    pub slug: &'static [&'static str],
    pub title: &'static [&'static str],
    pub body: &'static [&'static str],
    pub excerpt: &'static [&'static str],
    pub author: &'static [&'static str],
    pub author_id: &'static [&'static str],
    pub published: &'static [&'static str],
    pub updated: &'static [&'static str],
    pub locale: &'static [&'static str],
    pub status: &'static [&'static str],
    pub kind: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub attachment_url: &'static [&'static str],
    pub image_url: &'static [&'static str],
    pub image_id: &'static [&'static str],
    /// Kind used when the source carries no type field at all.
    pub untyped_kind: RecordKind,
}

pub const WXR_LAYOUT: FieldLayout = FieldLayout {
    id: &[TAG_POST_ID],
    slug: &[TAG_POST_NAME],
    title: &[TAG_TITLE],
    body: &[TAG_CONTENT],
    excerpt: &[TAG_EXCERPT],
    author: &[TAG_CREATOR],
    author_id: &[],
    published: &[TAG_POST_DATE_GMT, TAG_POST_DATE, TAG_PUB_DATE],
    updated: &[TAG_MODIFIED_GMT],
    locale: &[],
    status: &[TAG_STATUS],
    kind: &[TAG_POST_TYPE],
    categories: &[TAG_CATEGORY],
    attachment_url: &[TAG_ATTACHMENT_URL],
    image_url: &[],
    image_id: &[],
    untyped_kind: RecordKind::Discard,
};

/// Column aliases covering both the canonical `blogposts` table and legacy
/// `wp_posts` dumps.
pub const SQL_LAYOUT: FieldLayout = FieldLayout {
    id: &["id", "wp_id", "post_id"],
    slug: &["slug", "post_name"],
    title: &["title", "post_title"],
    body: &["content", "post_content", "body"],
    excerpt: &["excerpt", "post_excerpt"],
    author: &["author", "author_name"],
    // wp_posts stores the numeric user id in post_author
    author_id: &["author_id", "authorId", "post_author"],
    published: &[
        "created_at",
        "createdAt",
        "published_at",
        "post_date_gmt",
        "post_date",
    ],
    updated: &["updated_at", "updatedAt", "post_modified_gmt", "post_modified"],
    locale: &["locale", "lang", "language"],
    status: &["status", "post_status"],
    kind: &["post_type", "type"],
    categories: &["categories", "category", "tags"],
    attachment_url: &["guid", "attachment_url"],
    image_url: &["image_url", "imageUrl", "featured_image", "cover_image"],
    image_id: &["image_id", "imageId"],
    untyped_kind: RecordKind::Post,
};

/// Classifies one source record:
/// attachments with an id and URL are kept as attachments, anything with a
/// status other than published is discarded, posts and pages become content
/// records, and every other type is discarded.
pub fn classify<S: RecordSource>(source: &S, layout: &FieldLayout) -> IntermediateRecord {
    let declared_kind = source.value(layout.kind).map(|value| value.to_ascii_lowercase());
    let source_id = source.value(layout.id);
    let attachment_url = source.value(layout.attachment_url);

    if declared_kind.as_deref() == Some("attachment")
        && let (Some(id), Some(url)) = (source_id.as_ref(), attachment_url.as_ref())
    {
        let mut record = IntermediateRecord::new(RecordKind::Attachment);
        record.source_id = Some(id.clone());
        record.attachment_url = Some(url.clone());
        record.title = source.value(layout.title);
        record.slug = source.value(layout.slug);
        return record;
    }

    if let Some(status) = source.value(layout.status)
        && !is_published(&status)
    {
        return IntermediateRecord::new(RecordKind::Discard);
    }

    let kind = match declared_kind.as_deref() {
        Some("post") => RecordKind::Post,
        Some("page") => RecordKind::Page,
        Some(_) => RecordKind::Discard,
        None => layout.untyped_kind,
    };
    if !kind.is_content() {
        return IntermediateRecord::new(RecordKind::Discard);
    }

    let mut record = IntermediateRecord::new(kind);
    record.source_id = source_id;
    record.slug = source.value(layout.slug);
    record.title = source.value(layout.title);
    record.body = source.value(layout.body).unwrap_or_default();
    record.excerpt = source.value(layout.excerpt);
    record.author = Some(source.value(layout.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_string()));
    record.author_id = source.value(layout.author_id);
    record.published_at = first_timestamp(source, layout.published);
    record.updated_at = first_timestamp(source, layout.updated);
    record.locale = source.value(layout.locale);
    record.categories = source.values(layout.categories);
    record.metadata = source.metadata();
    record.image_url = source.value(layout.image_url);
    record.image_id = source.value(layout.image_id);
    record
}

/// Zero dates mark "never set" in legacy exports, so the next candidate wins.
fn first_timestamp<S: RecordSource>(source: &S, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| source.value(&[*name]))
        .find(|value| !value.starts_with("0000-00-00"))
}

fn is_published(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "publish" | "published"
    )
}
