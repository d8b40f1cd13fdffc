use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "content-migrate",
    version,
    about = "Convert legacy SQL and XML content exports into the canonical content document"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a SQL `INSERT` dump; replaces the blogPosts section
    Sql(SqlArgs),
    /// Convert an XML interchange export; keeps existing posts when none are found
    Wxr(WxrArgs),
    /// Re-apply link rewrite rules to an existing canonical document
    Rewrite(RewriteArgs),
    /// Report per-section record counts of a canonical document
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SqlArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "data/content.json")]
    pub output: PathBuf,

    /// Optional `(post_id, meta_key, meta_value)` dump supplying featured image references
    #[arg(long)]
    pub postmeta: Option<PathBuf>,

    /// Only use INSERT statements targeting this table
    #[arg(long)]
    pub table: Option<String>,

    #[command(flatten)]
    pub convert: ConvertArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WxrArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "data/content.json")]
    pub output: PathBuf,

    #[command(flatten)]
    pub convert: ConvertArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long, value_enum, default_value_t = Locale::Ng)]
    pub locale: Locale,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(flatten)]
    pub rewrite: RewriteRuleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RewriteRuleArgs {
    /// Host whose `/wp-content/uploads/` URLs are obsolete
    #[arg(long, default_value = "www.example.org")]
    pub legacy_upload_host: String,

    /// Base URL that replaces the obsolete upload host
    #[arg(long, default_value = "https://media.example.org")]
    pub media_base_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct RewriteArgs {
    #[arg(long, default_value = "data/content.json")]
    pub document: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(flatten)]
    pub rewrite: RewriteRuleArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/content.json")]
    pub document: PathBuf,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Locale {
    #[default]
    Ng,
    En,
    Fr,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ng => "ng",
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ng" => Some(Self::Ng),
            "en" => Some(Self::En),
            "fr" => Some(Self::Fr),
            _ => None,
        }
    }
}
