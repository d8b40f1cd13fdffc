use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::cli::Locale;
use crate::migrate::classify::DEFAULT_AUTHOR;
use crate::model::{CanonicalRecord, IntermediateRecord};

/// Maps intermediate records onto the canonical schema. `now` stands in for
/// any missing or unreadable publish timestamp.
#[derive(Debug, Clone)]
pub struct Normalizer {
    now: DateTime<Utc>,
    default_locale: Locale,
}

impl Normalizer {
    pub fn new(now: DateTime<Utc>, default_locale: Locale) -> Self {
        Self {
            now,
            default_locale,
        }
    }

    pub fn now_string(&self) -> String {
        format_timestamp(self.now)
    }

    /// Applies defaults, then drops the record if it still lacks an id, slug
    /// or title.
    pub fn normalize(&self, record: IntermediateRecord) -> Option<CanonicalRecord> {
        let slug = non_empty(record.slug.as_deref());
        let title = non_empty(record.title.as_deref());
        let id = non_empty(record.source_id.as_deref())
            .or_else(|| slug.clone())
            .or_else(|| title.clone());

        let author = non_empty(record.author.as_deref()).unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
        let locale = record
            .locale
            .as_deref()
            .and_then(Locale::parse)
            .unwrap_or(self.default_locale);
        let created_at = record
            .published_at
            .as_deref()
            .and_then(to_iso_timestamp)
            .unwrap_or_else(|| self.now_string());
        let updated_at = record.updated_at.as_deref().and_then(to_iso_timestamp);

        let image_url = non_empty(record.image_url.as_deref());
        let image_id = if image_url.is_some() {
            None
        } else {
            non_empty(record.image_id.as_deref())
        };

        Some(CanonicalRecord {
            id: id?,
            slug: slug?,
            title: title?,
            content: record.body,
            image_id,
            image_url,
            author,
            author_id: non_empty(record.author_id.as_deref()),
            locale: locale.as_str().to_string(),
            created_at,
            updated_at,
            excerpt: non_empty(record.excerpt.as_deref()),
            categories: record.categories,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses the timestamp shapes found in legacy dumps and renders them as
/// UTC ISO-8601. Naive values are taken as UTC; `+00` and `+00:00` read as `Z`.
pub fn to_iso_timestamp(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.starts_with("0000-00-00") {
        return None;
    }

    let mut candidate = value.to_string();
    if candidate.len() > 10 && candidate.as_bytes()[10] == b' ' {
        candidate.replace_range(10..11, "T");
    }
    // short "+HH" offsets as written by Postgres
    if let Some(sign_at) = candidate.len().checked_sub(3)
        && candidate.len() > 19
        && matches!(candidate.as_bytes()[sign_at], b'+' | b'-')
        && candidate.as_bytes()[sign_at + 1..].iter().all(u8::is_ascii_digit)
    {
        candidate.push_str(":00");
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(format_timestamp(parsed.with_timezone(&Utc)));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(format_timestamp(parsed.and_utc()));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M") {
        return Some(format_timestamp(parsed.and_utc()));
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(&candidate, "%Y-%m-%d") {
        return parsed
            .and_hms_opt(0, 0, 0)
            .map(|midnight| format_timestamp(midnight.and_utc()));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(format_timestamp(parsed.with_timezone(&Utc)));
    }

    None
}
