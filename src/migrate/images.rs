//! Representative image selection and content repair.
//!
//! Resolution order: explicit image field, featured-image metadata resolved
//! through the attachment table, first embedded `<img>`, then the keyword
//! fallback table. A candidate only counts when it is an http(s) URL or a
//! root-relative path.

use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::IntermediateRecord;

pub const FEATURED_IMAGE_KEYS: &[&str] = &["_thumbnail_id"];

pub const DEFAULT_FALLBACK_IMAGE: &str = "/images/fallback/default.jpg";

#[derive(Debug, Clone, Copy)]
pub struct FallbackRule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    pub image_url: &'static str,
}

/// Evaluated top to bottom; the first rule with a whole-word keyword hit wins.
pub const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        category: "mental-health",
        keywords: &[
            "mental health",
            "mental illness",
            "depression",
            "anxiety",
            "psychosocial",
            "trauma",
            "suicide",
            "wellbeing",
            "well-being",
            "counselling",
            "counseling",
        ],
        image_url: "/images/fallback/mental-health.jpg",
    },
    FallbackRule {
        category: "health",
        keywords: &[
            "health",
            "healthcare",
            "medical",
            "clinic",
            "hospital",
            "malaria",
            "hiv",
            "nutrition",
            "disease",
            "vaccine",
            "vaccination",
        ],
        image_url: "/images/fallback/health.jpg",
    },
    FallbackRule {
        category: "rights-justice",
        keywords: &[
            "rights",
            "human rights",
            "justice",
            "advocacy",
            "legal",
            "law",
            "gender",
            "equality",
            "inclusion",
            "discrimination",
        ],
        image_url: "/images/fallback/rights-justice.jpg",
    },
    FallbackRule {
        category: "education",
        keywords: &[
            "education",
            "school",
            "schools",
            "student",
            "students",
            "learning",
            "scholarship",
            "teacher",
            "teachers",
            "literacy",
        ],
        image_url: "/images/fallback/education.jpg",
    },
    FallbackRule {
        category: "capacity-building",
        keywords: &[
            "training",
            "workshop",
            "capacity building",
            "capacity",
            "skills",
            "mentorship",
            "mentoring",
            "empowerment",
        ],
        image_url: "/images/fallback/capacity-building.jpg",
    },
    FallbackRule {
        category: "emergency",
        keywords: &[
            "emergency",
            "humanitarian",
            "flood",
            "flooding",
            "crisis",
            "relief",
            "displaced",
            "disaster",
        ],
        image_url: "/images/fallback/emergency.jpg",
    },
    FallbackRule {
        category: "community",
        keywords: &[
            "community",
            "communities",
            "outreach",
            "volunteer",
            "volunteers",
            "youth",
            "women",
            "village",
        ],
        image_url: "/images/fallback/community.jpg",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Explicit,
    Featured,
    Embedded,
    Fallback(&'static str),
    Default,
}

impl ImageSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSource::Explicit => "explicit",
            ImageSource::Featured => "featured",
            ImageSource::Embedded => "embedded",
            ImageSource::Fallback(category) => category,
            ImageSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: String,
    pub source: ImageSource,
}

pub struct ImageResolver {
    img_tag: Regex,
    src_attr: Regex,
    alt_attr: Regex,
    fallbacks: Vec<(FallbackRule, Regex)>,
}

impl ImageResolver {
    pub fn new() -> Result<Self> {
        let mut fallbacks = Vec::with_capacity(FALLBACK_RULES.len());
        for rule in FALLBACK_RULES {
            let alternatives = rule
                .keywords
                .iter()
                .map(|keyword| regex::escape(keyword))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!(r"\b(?:{alternatives})\b")).with_context(|| {
                format!("failed to compile fallback keywords for {}", rule.category)
            })?;
            fallbacks.push((*rule, pattern));
        }

        Ok(Self {
            img_tag: Regex::new(r"(?is)<img\b[^>]*>").context("failed to compile img tag regex")?,
            src_attr: Regex::new(r#"(?is)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .context("failed to compile src attribute regex")?,
            alt_attr: Regex::new(r"(?i)\balt\s*=").context("failed to compile alt attribute regex")?,
            fallbacks,
        })
    }

    pub fn resolve(
        &self,
        record: &IntermediateRecord,
        attachments: &HashMap<String, String>,
    ) -> ResolvedImage {
        if let Some(url) = record.image_url.as_deref().and_then(accepted_url) {
            return ResolvedImage {
                url,
                source: ImageSource::Explicit,
            };
        }

        if let Some(url) = self.featured_url(record, attachments) {
            return ResolvedImage {
                url,
                source: ImageSource::Featured,
            };
        }

        if let Some(url) = self.first_embedded_src(&record.body).and_then(|src| accepted_url(&src)) {
            return ResolvedImage {
                url,
                source: ImageSource::Embedded,
            };
        }

        let title = record.title.as_deref().unwrap_or_default();
        self.fallback_for(title, &record.body)
    }

    fn featured_url(
        &self,
        record: &IntermediateRecord,
        attachments: &HashMap<String, String>,
    ) -> Option<String> {
        FEATURED_IMAGE_KEYS
            .iter()
            .filter_map(|key| record.meta(key))
            .next()
            .and_then(|attachment_id| attachments.get(attachment_id.trim()))
            .and_then(|url| accepted_url(url))
    }

    fn first_embedded_src(&self, body: &str) -> Option<String> {
        self.img_tag
            .find(body)
            .and_then(|tag| self.src_value(tag.as_str()))
    }

    fn src_value(&self, tag: &str) -> Option<String> {
        self.src_attr.captures(tag).map(|captures| {
            captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|value| value.as_str().to_string())
                .unwrap_or_default()
        })
    }

    /// Keyword fallback over the lower-cased title and body.
    pub fn fallback_for(&self, title: &str, body: &str) -> ResolvedImage {
        let haystack = format!("{title} {body}").to_lowercase();

        self.fallbacks
            .iter()
            .find(|(_, pattern)| pattern.is_match(&haystack))
            .map(|(rule, _)| ResolvedImage {
                url: rule.image_url.to_string(),
                source: ImageSource::Fallback(rule.category),
            })
            .unwrap_or_else(|| ResolvedImage {
                url: DEFAULT_FALLBACK_IMAGE.to_string(),
                source: ImageSource::Default,
            })
    }

    /// Makes sure `body` shows `image_url`: bodies that already have an image
    /// with a source are returned unchanged, an image with an empty source is
    /// filled in, and otherwise a figure is prepended.
    pub fn repair_content(&self, body: &str, image_url: &str, title: &str) -> String {
        let tags = self.img_tag.find_iter(body).collect::<Vec<_>>();

        let has_visible_image = tags.iter().any(|tag| {
            self.src_value(tag.as_str())
                .is_some_and(|src| !src.trim().is_empty())
        });
        if has_visible_image {
            return body.to_string();
        }

        let url = escape_attribute(image_url);
        let alt = escape_attribute(title);

        if let Some(tag) = tags.iter().find(|tag| self.src_attr.is_match(tag.as_str())) {
            let mut filled_src = format!(r#"src="{url}""#);
            if !self.alt_attr.is_match(tag.as_str()) {
                filled_src.push_str(&format!(r#" alt="{alt}""#));
            }
            let filled_tag = self
                .src_attr
                .replace(tag.as_str(), regex::NoExpand(&filled_src))
                .into_owned();

            let mut repaired = String::with_capacity(body.len() + filled_tag.len());
            repaired.push_str(&body[..tag.start()]);
            repaired.push_str(&filled_tag);
            repaired.push_str(&body[tag.end()..]);
            return repaired;
        }

        let figure = format!(
            r#"<figure class="wp-block-image"><img src="{url}" alt="{alt}" /></figure>"#
        );
        if body.trim().is_empty() {
            figure
        } else {
            format!("{figure}\n{body}")
        }
    }
}

/// Returns the trimmed value when it is an http(s) URL or a root-relative path.
pub fn accepted_url(raw: &str) -> Option<String> {
    let value = raw.trim();
    let lowered = value.to_ascii_lowercase();
    let accepted = lowered.starts_with("https://")
        || lowered.starts_with("http://")
        || (value.starts_with('/') && !value.starts_with("//"));

    accepted.then(|| value.to_string())
}

fn escape_attribute(value: &str) -> String {
    value.replace('"', "&quot;").replace('\'', "&#39;")
}
