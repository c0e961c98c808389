use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use compiler::CompilerConfig;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "rill.toml";

/// Contents of `rill.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RillConfig {
    pub compiler: CompilerConfig,
}

impl RillConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load `explicit` if given, else `./rill.toml` if it exists, else the
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn with_overrides(mut self, max_line_len: Option<usize>, max_lines: Option<usize>) -> Self {
        if let Some(n) = max_line_len {
            self.compiler.max_line_len = n;
        }
        if let Some(n) = max_lines {
            self.compiler.max_lines = n;
        }
        self
    }
}
