//! Text rewrites applied to bodies before normalization: stale upload URLs
//! are moved to the media host, and NYSC eligibility wording in job posts is
//! removed or softened. Wording rules only touch text outside tags and URLs.
//! Rules run in order and are idempotent.

use anyhow::{Context, Result};
use regex::Regex;
use tracing::trace;

/// NYSC wording substitutions, most specific first.
const ELIGIBILITY_RULES: &[(&str, &str)] = &[
    (
        r"(?i)[,;]?\s*(?:and|or)?\s*(?:must\s+have\s+)?(?:completed|concluded)\s+(?:the\s+|their\s+|your\s+)?(?:mandatory\s+)?NYSC(?:\s+programme|\s+program)?",
        "",
    ),
    (
        r"(?i)\(\s*(?:post[- ])?NYSC(?:\s+(?:completed|required|mandatory))?\s*\)",
        "",
    ),
    (
        r"(?i)\bNYSC\s+(?:discharge|exemption|completion|exclusion)\s+certificates?\b",
        "evidence of national service completion",
    ),
    (r"(?i)\bpost[- ]NYSC\b", "post-service"),
    (r"(?i)\bNYSC\b", "national service"),
];

struct EligibilityRule {
    pattern: Regex,
    replacement: &'static str,
}

pub struct LinkRewriter {
    legacy_uploads: Regex,
    media_uploads: String,
    eligibility: Vec<EligibilityRule>,
    protected: Regex,
}

impl LinkRewriter {
    /// `legacy_host` is the obsolete host serving `/wp-content/uploads/`;
    /// `media_base_url` replaces its scheme and host.
    pub fn new(legacy_host: &str, media_base_url: &str) -> Result<Self> {
        let host = legacy_host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let bare_host = host.strip_prefix("www.").unwrap_or(host);
        let media_base = media_base_url.trim().trim_end_matches('/');

        let mut eligibility = Vec::with_capacity(ELIGIBILITY_RULES.len());
        for (index, (pattern, replacement)) in ELIGIBILITY_RULES.iter().enumerate() {
            eligibility.push(EligibilityRule {
                pattern: Regex::new(pattern)
                    .with_context(|| format!("failed to compile eligibility rule {}", index + 1))?,
                replacement: *replacement,
            });
        }

        Ok(Self {
            legacy_uploads: Regex::new(&format!(
                r"(?i)https?://(?:www\.)?{}/wp-content/uploads/",
                regex::escape(bare_host)
            ))
            .context("failed to compile legacy upload host regex")?,
            media_uploads: format!("{media_base}/wp-content/uploads/"),
            eligibility,
            protected: Regex::new(r#"(?is)<[^>]*>|\b(?:https?://|www\.)[^\s<>"']+"#)
                .context("failed to compile markup and URL regex")?,
        })
    }

    /// Moves legacy upload URLs to the media host. This is the only rule
    /// applied to URL fields.
    pub fn rewrite_url(&self, url: &str) -> String {
        self.legacy_uploads
            .replace_all(url, regex::NoExpand(&self.media_uploads))
            .into_owned()
    }

    /// Rewrites a markup body: upload URLs everywhere, eligibility wording
    /// only in text outside tags and URLs.
    pub fn rewrite(&self, text: &str) -> String {
        let relocated = self.rewrite_url(text);
        if !self
            .eligibility
            .iter()
            .any(|rule| rule.pattern.is_match(&relocated))
        {
            return relocated;
        }

        let mut rewritten = String::with_capacity(relocated.len());
        let mut last_end = 0usize;
        for span in self.protected.find_iter(&relocated) {
            rewritten.push_str(&self.soften(&relocated[last_end..span.start()]));
            rewritten.push_str(span.as_str());
            last_end = span.end();
        }
        rewritten.push_str(&self.soften(&relocated[last_end..]));
        rewritten
    }

    fn soften(&self, segment: &str) -> String {
        let mut current = segment.to_string();
        for (index, rule) in self.eligibility.iter().enumerate() {
            if rule.pattern.is_match(&current) {
                trace!(rule = index + 1, "applying eligibility rule");
                current = replace_tidy(&rule.pattern, rule.replacement, &current);
            }
        }
        current
    }
}

/// Replaces every match and tidies the spacing at each replacement site:
/// spaces meeting there collapse to one, or vanish before punctuation.
fn replace_tidy(pattern: &Regex, replacement: &str, text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last_end = 0usize;

    for found in pattern.find_iter(text) {
        // a match may begin inside spaces already tidied after the previous one
        output.push_str(&text[last_end..found.start().max(last_end)]);
        output.push_str(replacement);
        last_end = found.end();

        let rest = &text[last_end..];
        let following = rest.trim_start_matches(' ');
        let kept = output.trim_end_matches(' ').len();
        let spaces = (output.len() - kept) + (rest.len() - following.len());
        if spaces == 0 {
            continue;
        }

        output.truncate(kept);
        let before_punctuation = following.starts_with([',', '.', ';', ':', '!', '?']);
        if !before_punctuation && !output.is_empty() {
            output.push(' ');
        }
        last_end = text.len() - following.len();
    }

    output.push_str(&text[last_end..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> LinkRewriter {
        LinkRewriter::new("www.example.org", "https://media.example.org/").unwrap()
    }

    #[test]
    fn legacy_upload_urls_move_to_media_host() {
        let body = r#"<img src="http://example.org/wp-content/uploads/2020/01/a.jpg"> <a href="https://WWW.example.org/wp-content/uploads/b.pdf">b</a>"#;
        assert_eq!(
            rewriter().rewrite(body),
            r#"<img src="https://media.example.org/wp-content/uploads/2020/01/a.jpg"> <a href="https://media.example.org/wp-content/uploads/b.pdf">b</a>"#
        );
    }

    #[test]
    fn other_urls_on_the_legacy_host_are_untouched() {
        let body = "See https://www.example.org/about/ and https://notexample.org/wp-content/uploads/x.jpg";
        assert_eq!(rewriter().rewrite(body), body);
    }

    #[test]
    fn completed_nysc_clause_is_removed() {
        let text = "Applicants must hold a degree and must have completed NYSC.";
        assert_eq!(rewriter().rewrite(text), "Applicants must hold a degree.");
    }

    #[test]
    fn nysc_certificate_is_softened() {
        let text = "Attach your CV, NYSC discharge certificate and ID.";
        assert_eq!(
            rewriter().rewrite(text),
            "Attach your CV, evidence of national service completion and ID."
        );
    }

    #[test]
    fn parenthesised_and_bare_mentions() {
        let text = "Graduate (post-NYSC) role for post NYSC graduates; NYSC members welcome.";
        assert_eq!(
            rewriter().rewrite(text),
            "Graduate role for post-service graduates; national service members welcome."
        );
    }

    #[test]
    fn rewriting_twice_changes_nothing() {
        let rewriter = rewriter();
        let text = "Must have completed the NYSC programme . See http://www.example.org/wp-content/uploads/x.jpg  now";
        let once = rewriter.rewrite(text);
        assert_eq!(rewriter.rewrite(&once), once);
    }

    #[test]
    fn urls_and_attributes_keep_their_wording() {
        let body = r#"<img src="https://cdn.example.net/uploads/nysc-camp.jpg"><a href="/jobs/post-nysc-roles">NYSC roles</a> listed at https://jobs.example.net/nysc-2024"#;
        assert_eq!(
            rewriter().rewrite(body),
            r#"<img src="https://cdn.example.net/uploads/nysc-camp.jpg"><a href="/jobs/post-nysc-roles">national service roles</a> listed at https://jobs.example.net/nysc-2024"#
        );
    }

    #[test]
    fn url_rewrite_only_moves_the_upload_host() {
        let rewriter = rewriter();
        assert_eq!(
            rewriter.rewrite_url("https://www.example.org/wp-content/uploads/2023/nysc-orientation.jpg"),
            "https://media.example.org/wp-content/uploads/2023/nysc-orientation.jpg"
        );
        assert_eq!(
            rewriter.rewrite_url("https://cdn.example.net/post-nysc.jpg"),
            "https://cdn.example.net/post-nysc.jpg"
        );
    }

    #[test]
    fn spacing_is_only_tidied_where_wording_was_removed() {
        let text = "<pre>a  b ,c</pre><p>Keep  this , as is. Applicants must have completed NYSC.</p>";
        assert_eq!(
            rewriter().rewrite(text),
            "<pre>a  b ,c</pre><p>Keep  this , as is. Applicants.</p>"
        );
    }

    #[test]
    fn text_without_matches_is_unchanged() {
        let text = "Plain  text , with odd spacing.";
        assert_eq!(rewriter().rewrite(text), text);
    }
}
