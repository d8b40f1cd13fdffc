use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a source record turned out to be after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Attachment,
    Post,
    Page,
    Discard,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Attachment => "attachment",
            RecordKind::Post => "post",
            RecordKind::Page => "page",
            RecordKind::Discard => "discard",
        }
    }

    pub fn is_content(self) -> bool {
        matches!(self, RecordKind::Post | RecordKind::Page)
    }
}

/// A classified but not yet normalized record from either source format.
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateRecord {
    pub kind: RecordKind,
    pub source_id: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<String>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub locale: Option<String>,
    pub categories: Vec<String>,
    pub metadata: Vec<(String, String)>,
    pub attachment_url: Option<String>,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
}

impl IntermediateRecord {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            source_id: None,
            slug: None,
            title: None,
            body: String::new(),
            excerpt: None,
            author: None,
            author_id: None,
            published_at: None,
            updated_at: None,
            locale: None,
            categories: Vec::new(),
            metadata: Vec::new(),
            attachment_url: None,
            image_url: None,
            image_id: None,
        }
    }

    /// First metadata value stored under `key`.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub locale: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

/// The sectioned output document. Records are kept as raw JSON values so that
/// sections a run does not touch are written back exactly as they were read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
    #[serde(default)]
    pub images: Vec<Value>,
    #[serde(default)]
    pub programs: Vec<Value>,
    #[serde(default)]
    pub blog_posts: Vec<Value>,
    #[serde(default)]
    pub news_articles: Vec<Value>,
    #[serde(default)]
    pub announcements: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalDocument {
    pub fn section_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("images", self.images.len()),
            ("programs", self.programs.len()),
            ("blogPosts", self.blog_posts.len()),
            ("newsArticles", self.news_articles.len()),
            ("announcements", self.announcements.len()),
            ("pages", self.pages.as_ref().map(Vec::len).unwrap_or(0)),
        ]
    }
}
