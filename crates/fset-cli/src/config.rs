use std::path::Path;

use anyhow::Context;
use fset::{ReadOptions, WriteOptions};
use serde::{Deserialize, Serialize};

/// Options loaded from `--config`, before command-line overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub read: ReadOptions,
    pub write: WriteOptions,
}

impl CliConfig {
    /// Load from a TOML file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply the global `--tolerant` and `--multiple` flags.
    pub fn with_flags(mut self, tolerant: bool, multiple: bool) -> Self {
        self.read.tolerant |= tolerant;
        self.read.allow_multiple |= multiple;
        self
    }
}
