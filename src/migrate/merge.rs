//! Read-modify-write of the canonical document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

use crate::model::{CanonicalDocument, CanonicalRecord, ImageRecord};
use crate::util::write_json_pretty;

/// How a run's freshly derived posts replace the stored `blogPosts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostsPolicy {
    /// Full re-import: the stored array is always replaced.
    Replace,
    /// Incremental: the stored array is kept when nothing new was derived.
    ReplaceIfNonEmpty,
}

impl PostsPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            PostsPolicy::Replace => "replace",
            PostsPolicy::ReplaceIfNonEmpty => "replace-if-non-empty",
        }
    }
}

/// Sections derived by one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionUpdate {
    pub images: Vec<ImageRecord>,
    pub blog_posts: Vec<CanonicalRecord>,
    pub pages: Vec<CanonicalRecord>,
}

/// Loads the destination document, or an empty one when the file is absent.
pub fn load_document(path: &Path) -> Result<CanonicalDocument> {
    if !path.exists() {
        info!(path = %path.display(), "destination document missing, starting empty");
        return Ok(CanonicalDocument::default());
    }

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(CanonicalDocument::default());
    }

    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_document(path: &Path, document: &CanonicalDocument) -> Result<()> {
    write_json_pretty(path, document)
}

/// Applies `update` to `existing`. Images merge by key with the update
/// winning; posts follow `policy`; pages are replaced only by a non-empty
/// set; every other section is carried over as read.
pub fn merge_document(
    mut existing: CanonicalDocument,
    update: &SectionUpdate,
    policy: PostsPolicy,
) -> Result<CanonicalDocument> {
    if !update.images.is_empty() {
        let fresh = to_values(&update.images).context("failed to serialize image records")?;
        existing.images = merge_images(std::mem::take(&mut existing.images), fresh);
    }

    let replace_posts = match policy {
        PostsPolicy::Replace => true,
        PostsPolicy::ReplaceIfNonEmpty => !update.blog_posts.is_empty(),
    };
    if replace_posts {
        existing.blog_posts =
            to_values(&update.blog_posts).context("failed to serialize blog post records")?;
    }

    if !update.pages.is_empty() {
        existing.pages = Some(to_values(&update.pages).context("failed to serialize page records")?);
    }

    Ok(existing)
}

/// Keyed merge: existing entries seed the map in order, fresh entries
/// overwrite in place or append. Entries with no usable key are dropped.
pub fn merge_images(existing: Vec<Value>, fresh: Vec<Value>) -> Vec<Value> {
    let mut by_key = Map::new();

    for entry in existing.into_iter().chain(fresh) {
        if let Some(key) = image_key(&entry) {
            by_key.insert(key, entry);
        }
    }

    by_key.into_iter().map(|(_, entry)| entry).collect()
}

/// `id`, then the older `imageId`/`slug` fields, then the URL itself.
fn image_key(entry: &Value) -> Option<String> {
    ["id", "imageId", "slug", "url", "src"]
        .iter()
        .filter_map(|field| entry.get(field))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}

fn to_values<T: serde::Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|record| serde_json::to_value(record).map_err(Into::into))
        .collect()
}
