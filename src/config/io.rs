//! `config.json` reading and writing.
//!
//! String conversions return the typed [`ConfigError`]; file and directory
//! helpers wrap it with the path in an `anyhow` context.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::Result;

use super::model::DogeConfig;
use super::params::DogeParams;

/// File name of the config inside a checkpoint directory.
pub const CONFIG_NAME: &str = "config.json";

impl DogeConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: DogeParams = serde_json::from_str(json)?;
        Self::new(params)
    }

    /// Pretty-printed JSON document, including pass-through keys.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut text = self.to_json_string()?;
        text.push('\n');
        fs::write(path, text)
            .with_context(|| format!("failed to write config '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote config");
        Ok(())
    }

    /// Load `config.json` from a checkpoint directory.
    pub fn from_pretrained(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::from_json_file(dir.as_ref().join(CONFIG_NAME))
    }

    /// Write `config.json` into `dir`, creating the directory if needed.
    pub fn save_pretrained(&self, dir: impl AsRef<Path>) -> anyhow::Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create checkpoint directory '{}'", dir.display()))?;
        self.to_json_file(dir.join(CONFIG_NAME))
    }
}
