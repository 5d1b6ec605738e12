use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$SPENDBOARD_HOME`, else `~/.spendboard`
pub fn spendboard_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("SPENDBOARD_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".spendboard"))
}

pub fn ensure_spendboard_home() -> Result<PathBuf> {
    let dir = spendboard_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
