use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$RECEIPT_HOME`, else `~/.receipt`.
pub fn receipt_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RECEIPT_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".receipt"))
}

pub fn ensure_receipt_home() -> Result<PathBuf> {
    let dir = receipt_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Read an environment variable, treating blank values as unset.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
