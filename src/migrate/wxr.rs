//! Item extraction from XML interchange exports.
//!
//! The export is treated as text: `<item>` blocks never nest, so each block is
//! found with a non-greedy match and the known tags are read out of it. Tag
//! values are trimmed and CDATA-unwrapped; nothing is entity-decoded.

use anyhow::{Context, Result};
use regex::Regex;

pub const TAG_TITLE: &str = "title";
pub const TAG_POST_ID: &str = "wp:post_id";
pub const TAG_POST_NAME: &str = "wp:post_name";
pub const TAG_POST_TYPE: &str = "wp:post_type";
pub const TAG_STATUS: &str = "wp:status";
pub const TAG_CONTENT: &str = "content:encoded";
pub const TAG_EXCERPT: &str = "excerpt:encoded";
pub const TAG_CREATOR: &str = "dc:creator";
pub const TAG_POST_DATE_GMT: &str = "wp:post_date_gmt";
pub const TAG_POST_DATE: &str = "wp:post_date";
pub const TAG_MODIFIED_GMT: &str = "wp:post_modified_gmt";
pub const TAG_PUB_DATE: &str = "pubDate";
pub const TAG_CATEGORY: &str = "category";
pub const TAG_ATTACHMENT_URL: &str = "wp:attachment_url";

const TAG_POSTMETA: &str = "wp:postmeta";
const TAG_META_KEY: &str = "wp:meta_key";
const TAG_META_VALUE: &str = "wp:meta_value";

const ITEM_TAGS: &[&str] = &[
    TAG_TITLE,
    TAG_POST_ID,
    TAG_POST_NAME,
    TAG_POST_TYPE,
    TAG_STATUS,
    TAG_CONTENT,
    TAG_EXCERPT,
    TAG_CREATOR,
    TAG_POST_DATE_GMT,
    TAG_POST_DATE,
    TAG_MODIFIED_GMT,
    TAG_PUB_DATE,
    TAG_CATEGORY,
    TAG_ATTACHMENT_URL,
];

/// One `<item>` block: every occurrence of the known tags in document order,
/// plus the `(key, value)` pairs of its metadata sub-blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedItem {
    pub fields: Vec<(String, String)>,
    pub metadata: Vec<(String, String)>,
}

impl ExtractedItem {
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, value)| value.as_str())
    }

    pub fn all(&self, tag: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(name, _)| name == tag)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

pub struct ItemExtractor {
    item_block: Regex,
    tags: Vec<(&'static str, Regex)>,
    postmeta: Regex,
    meta_key: Regex,
    meta_value: Regex,
}

impl ItemExtractor {
    pub fn new() -> Result<Self> {
        let mut tags = Vec::with_capacity(ITEM_TAGS.len());
        for tag in ITEM_TAGS {
            tags.push((*tag, tag_pattern(tag)?));
        }

        Ok(Self {
            item_block: tag_pattern("item")?,
            tags,
            postmeta: tag_pattern(TAG_POSTMETA)?,
            meta_key: tag_pattern(TAG_META_KEY)?,
            meta_value: tag_pattern(TAG_META_VALUE)?,
        })
    }

    /// All `<item>` blocks of `document`, in order. A document without items
    /// yields an empty list.
    pub fn extract(&self, document: &str) -> Vec<ExtractedItem> {
        self.item_block
            .captures_iter(document)
            .filter_map(|captures| captures.get(1))
            .map(|block| self.extract_item(block.as_str()))
            .collect()
    }

    fn extract_item(&self, block: &str) -> ExtractedItem {
        let mut metadata = Vec::new();
        let mut remainder = String::with_capacity(block.len());
        let mut last_end = 0usize;

        // metadata blocks are cut out so their inner tags never shadow item tags
        for captures in self.postmeta.captures_iter(block) {
            let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            remainder.push_str(&block[last_end..whole.start()]);
            last_end = whole.end();

            let inner = inner.as_str();
            let key = first_value(&self.meta_key, inner);
            let value = first_value(&self.meta_value, inner).unwrap_or_default();
            if let Some(key) = key {
                metadata.push((key, value));
            }
        }
        remainder.push_str(&block[last_end..]);

        let mut positioned = Vec::new();
        for (tag, pattern) in &self.tags {
            for captures in pattern.captures_iter(&remainder) {
                if let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) {
                    positioned.push((whole.start(), tag.to_string(), unwrap_value(inner.as_str())));
                }
            }
        }
        positioned.sort_by_key(|(start, _, _)| *start);

        ExtractedItem {
            fields: positioned
                .into_iter()
                .map(|(_, tag, value)| (tag, value))
                .collect(),
            metadata,
        }
    }
}

fn tag_pattern(tag: &str) -> Result<Regex> {
    let escaped = regex::escape(tag);
    Regex::new(&format!(r"(?s)<{escaped}(?:\s[^>]*)?>(.*?)</{escaped}\s*>"))
        .with_context(|| format!("failed to compile <{tag}> regex"))
}

fn first_value(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|inner| unwrap_value(inner.as_str()))
}

/// Trims the raw inner text and removes a surrounding CDATA marker, rejoining
/// the `]]]]><![CDATA[>` split exporters use to embed `]]>`.
pub fn unwrap_value(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        Some(inner) => inner.replace("]]]]><![CDATA[>", "]]>"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<rss version="2.0" xmlns:wp="http://wordpress.org/export/1.2/">
<channel>
  <title>Site title</title>
  <item>
    <title><![CDATA[Hello & <b>World</b>]]></title>
    <dc:creator><![CDATA[editor]]></dc:creator>
    <content:encoded><![CDATA[<p>Body with <title>inline</title></p>]]></content:encoded>
    <wp:post_id>12</wp:post_id>
    <wp:post_name><![CDATA[hello-world]]></wp:post_name>
    <wp:status><![CDATA[publish]]></wp:status>
    <wp:post_type><![CDATA[post]]></wp:post_type>
    <category domain="category" nicename="news"><![CDATA[News]]></category>
    <category domain="post_tag" nicename="health"><![CDATA[Health]]></category>
    <wp:postmeta>
      <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
      <wp:meta_value><![CDATA[40]]></wp:meta_value>
    </wp:postmeta>
    <wp:postmeta>
      <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
      <wp:meta_value><![CDATA[41]]></wp:meta_value>
    </wp:postmeta>
  </item>
  <item>
    <title>  Plain title  </title>
    <wp:post_type>attachment</wp:post_type>
  </item>
</channel>
</rss>"#;

    #[test]
    fn extracts_items_in_order_and_ignores_channel_tags() {
        let extractor = ItemExtractor::new().unwrap();
        let items = extractor.extract(EXPORT);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].first(TAG_TITLE), Some("Hello & <b>World</b>"));
        assert_eq!(items[1].first(TAG_TITLE), Some("Plain title"));
        assert_eq!(items[1].first(TAG_POST_TYPE), Some("attachment"));
    }

    #[test]
    fn cdata_is_unwrapped_verbatim() {
        assert_eq!(
            unwrap_value("<![CDATA[Hello & <b>World</b>]]>"),
            "Hello & <b>World</b>"
        );
        assert_eq!(unwrap_value("  a &amp; b "), "a &amp; b");
        assert_eq!(
            unwrap_value("<![CDATA[x ]]]]><![CDATA[> y]]>"),
            "x ]]> y"
        );
    }

    #[test]
    fn repeated_tags_are_all_collected() {
        let extractor = ItemExtractor::new().unwrap();
        let items = extractor.extract(EXPORT);

        assert_eq!(items[0].all(TAG_CATEGORY), vec!["News", "Health"]);
        assert_eq!(items[0].first(TAG_CATEGORY), Some("News"));
    }

    #[test]
    fn namespaced_tags_match_exactly() {
        let extractor = ItemExtractor::new().unwrap();
        let items = extractor.extract(EXPORT);

        assert_eq!(items[0].first(TAG_POST_ID), Some("12"));
        assert_eq!(items[0].first(TAG_POST_NAME), Some("hello-world"));
        assert_eq!(items[0].first(TAG_CREATOR), Some("editor"));
        assert_eq!(items[0].first(TAG_POST_DATE), None);
    }

    #[test]
    fn metadata_pairs_keep_duplicates_in_order() {
        let extractor = ItemExtractor::new().unwrap();
        let items = extractor.extract(EXPORT);

        assert_eq!(
            items[0].metadata,
            vec![
                ("_thumbnail_id".to_string(), "40".to_string()),
                ("_thumbnail_id".to_string(), "41".to_string()),
            ]
        );
        assert!(items[1].metadata.is_empty());
    }

    #[test]
    fn document_without_items_yields_nothing() {
        let extractor = ItemExtractor::new().unwrap();
        assert!(extractor.extract("<rss><channel></channel></rss>").is_empty());
        assert!(extractor.extract("<items>not an item</items>").is_empty());
    }
}
