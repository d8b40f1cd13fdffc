use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reads a whole input file as text, rejecting missing and blank inputs.
pub fn read_input_text(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }

    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("input is empty: {}", path.display());
    }

    Ok(text)
}

/// Writes pretty JSON with a trailing newline. The data goes to a sibling
/// temporary file first and is renamed into place, so the destination is
/// either the previous document or the complete new one.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let staging_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&staging_path)
            .with_context(|| format!("failed to create json file: {}", staging_path.display()))?;
        file.write_all(&data)
            .with_context(|| format!("failed to write json file: {}", staging_path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to finalize json file: {}", staging_path.display()))?;
    }

    fs::rename(&staging_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            staging_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn write_json_pretty_creates_parents_and_ends_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json_pretty(&path, &serde_json::json!({ "a": 1 })).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\"a\": 1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn read_input_text_rejects_missing_and_blank_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.sql");
        let err = read_input_text(&missing).unwrap_err();
        assert!(err.to_string().contains("not found"));

        let blank = dir.path().join("blank.sql");
        fs::write(&blank, "  \n\t").unwrap();
        let err = read_input_text(&blank).unwrap_err();
        assert!(err.to_string().contains("input is empty"));
    }

    #[test]
    fn sha256_text_is_stable() {
        assert_eq!(sha256_text("abc"), sha256_text("abc"));
        assert_eq!(
            sha256_text(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
