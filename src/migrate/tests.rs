use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use super::classify::{SQL_LAYOUT, WXR_LAYOUT, classify};
use super::images::DEFAULT_FALLBACK_IMAGE;
use super::links::LinkRewriter;
use super::merge::{PostsPolicy, load_document, merge_document, write_document};
use super::pipeline::{Migration, MigrationOutput};
use super::sql::{pair_rows, parse_insert_statements};
use super::wxr::ItemExtractor;
use crate::cli::Locale;
use crate::model::IntermediateRecord;

const NOW: &str = "2026-10-19T12:00:00.000Z";

fn migration() -> Migration {
    let rewriter = LinkRewriter::new("www.example.org", "https://media.example.org").unwrap();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    Migration::new(rewriter, now, Locale::Ng).unwrap()
}

fn sql_records(dump: &str) -> Vec<IntermediateRecord> {
    let statements = parse_insert_statements(dump, None).unwrap();
    pair_rows(&statements)
        .rows
        .iter()
        .map(|row| classify(row, &SQL_LAYOUT))
        .collect()
}

fn wxr_records(document: &str) -> Vec<IntermediateRecord> {
    ItemExtractor::new()
        .unwrap()
        .extract(document)
        .iter()
        .map(|item| classify(item, &WXR_LAYOUT))
        .collect()
}

fn commit(output: &MigrationOutput, path: &Path, policy: PostsPolicy) -> Value {
    let existing = load_document(path).unwrap();
    let merged = merge_document(existing, &output.update, policy).unwrap();
    write_document(path, &merged).unwrap();
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn sql_dump_into_fresh_document() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data").join("content.json");

    let dump = "INSERT INTO blogposts (id, title, slug, content, image_url) VALUES (1,'Hello','hello-world','<p>Hi</p>',NULL);";
    let output = migration().run(sql_records(dump));
    let written = commit(&output, &path, PostsPolicy::Replace);

    let posts = written["blogPosts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post["id"], "1");
    assert_eq!(post["slug"], "hello-world");
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["author"], "Admin");
    assert_eq!(post["locale"], "ng");
    assert_eq!(post["createdAt"], NOW);
    assert_eq!(post["imageUrl"], DEFAULT_FALLBACK_IMAGE);

    let content = post["content"].as_str().unwrap();
    assert!(content.contains("<p>Hi</p>"));
    assert!(content.contains(&format!(r#"<img src="{DEFAULT_FALLBACK_IMAGE}""#)));

    assert_eq!(written["images"], json!([]));
    assert!(written.get("pages").is_none());
}

#[test]
fn quoted_blogposts_insert_into_document_without_posts() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("content.json");
    let existing = json!({
        "images": [{ "id": "hero", "url": "/hero.jpg" }],
        "programs": [{ "slug": "p", "title": "Program" }],
        "blogPosts": [],
        "newsArticles": [],
        "announcements": []
    });
    fs::write(&path, serde_json::to_string_pretty(&existing).unwrap()).unwrap();

    let dump = r#"INSERT INTO "public"."blogposts" ("id","title","slug","content") VALUES ('1','Hello','hello-world','<p>Hi</p>');"#;
    let output = migration().run(sql_records(dump));
    let written = commit(&output, &path, PostsPolicy::Replace);

    let posts = written["blogPosts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], "1");
    assert_eq!(posts[0]["slug"], "hello-world");
    assert_eq!(posts[0]["title"], "Hello");
    assert_eq!(posts[0]["createdAt"], NOW);
    assert_eq!(
        posts[0]["content"],
        format!(
            "<figure class=\"wp-block-image\"><img src=\"{DEFAULT_FALLBACK_IMAGE}\" alt=\"Hello\" /></figure>\n<p>Hi</p>"
        )
    );
    assert_eq!(written["images"], existing["images"]);
    assert_eq!(written["programs"], existing["programs"]);
}

#[test]
fn export_without_posts_keeps_stored_posts() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("content.json");
    let existing = json!({
        "images": [{ "id": "hero", "url": "/hero.jpg" }],
        "programs": [{ "slug": "p", "title": "Program" }],
        "blogPosts": [{ "id": "kept", "slug": "kept", "title": "Kept" }],
        "newsArticles": [],
        "announcements": [],
        "siteSettings": { "theme": "dark" }
    });
    fs::write(&path, serde_json::to_string_pretty(&existing).unwrap()).unwrap();

    let export = r#"<rss><channel><title>Site</title>
        <item>
            <title>Logo</title>
            <wp:post_id>5</wp:post_id>
            <wp:post_type><![CDATA[attachment]]></wp:post_type>
            <wp:status>inherit</wp:status>
            <wp:attachment_url>https://cdn.example.org/logo.png</wp:attachment_url>
        </item>
        <item>
            <title>Draft</title>
            <wp:post_type>post</wp:post_type>
            <wp:status>draft</wp:status>
        </item>
    </channel></rss>"#;
    let output = migration().run(wxr_records(export));
    assert_eq!(output.stats.posts, 0);

    let written = commit(&output, &path, PostsPolicy::ReplaceIfNonEmpty);
    assert_eq!(written["blogPosts"], existing["blogPosts"]);
    assert_eq!(written["programs"], existing["programs"]);
    assert_eq!(written["siteSettings"], existing["siteSettings"]);
    assert_eq!(
        written["images"],
        json!([
            { "id": "hero", "url": "/hero.jpg" },
            { "id": "wp-media-5", "url": "https://cdn.example.org/logo.png", "alt": "Logo" }
        ])
    );
}

#[test]
fn export_featured_image_and_rewrites() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("content.json");

    let export = r#"<rss><channel>
        <item>
            <title><![CDATA[Graduate Trainee]]></title>
            <wp:post_id>10</wp:post_id>
            <wp:post_name>graduate-trainee</wp:post_name>
            <wp:post_type>post</wp:post_type>
            <wp:status>publish</wp:status>
            <dc:creator><![CDATA[editor]]></dc:creator>
            <wp:post_date_gmt>2023-04-02 09:30:00</wp:post_date_gmt>
            <content:encoded><![CDATA[<p>Open to NYSC members.</p>]]></content:encoded>
            <category><![CDATA[Jobs]]></category>
            <wp:postmeta>
                <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
                <wp:meta_value><![CDATA[11]]></wp:meta_value>
            </wp:postmeta>
        </item>
        <item>
            <title>Banner</title>
            <wp:post_id>11</wp:post_id>
            <wp:post_type>attachment</wp:post_type>
            <wp:attachment_url>http://www.example.org/wp-content/uploads/2023/04/banner.jpg</wp:attachment_url>
        </item>
        <item>
            <title>About</title>
            <wp:post_id>12</wp:post_id>
            <wp:post_name>about</wp:post_name>
            <wp:post_type>page</wp:post_type>
            <wp:status>publish</wp:status>
            <content:encoded></content:encoded>
        </item>
    </channel></rss>"#;
    let output = migration().run(wxr_records(export));
    let written = commit(&output, &path, PostsPolicy::ReplaceIfNonEmpty);

    let banner = "https://media.example.org/wp-content/uploads/2023/04/banner.jpg";
    let post = &written["blogPosts"][0];
    assert_eq!(post["id"], "10");
    assert_eq!(post["author"], "editor");
    assert_eq!(post["createdAt"], "2023-04-02T09:30:00.000Z");
    assert_eq!(post["imageUrl"], banner);
    assert_eq!(post["categories"], json!(["Jobs"]));
    assert_eq!(
        post["content"],
        format!(
            "<figure class=\"wp-block-image\"><img src=\"{banner}\" alt=\"Graduate Trainee\" /></figure>\n<p>Open to national service members.</p>"
        )
    );

    let pages = written["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["slug"], "about");
    assert_eq!(pages[0]["imageUrl"], DEFAULT_FALLBACK_IMAGE);

    assert_eq!(written["images"][0]["id"], "wp-media-11");
    assert_eq!(written["images"][0]["url"], banner);
}

#[test]
fn rerunning_the_same_dump_is_stable() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("content.json");
    let dump = "INSERT INTO blogposts (id, title, slug, content, created_at) VALUES \
                (1,'Clinic','clinic','<p>Mental health day</p>','2024-02-01 10:00:00'), \
                (2,'Skills','skills','<p>Training workshop</p>',NULL);";

    let first = commit(&migration().run(sql_records(dump)), &path, PostsPolicy::Replace);
    let second = commit(&migration().run(sql_records(dump)), &path, PostsPolicy::Replace);

    assert_eq!(first, second);
    assert_eq!(first["blogPosts"][0]["imageUrl"], "/images/fallback/mental-health.jpg");
    assert_eq!(first["blogPosts"][1]["imageUrl"], "/images/fallback/capacity-building.jpg");
}
