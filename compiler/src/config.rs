use serde::Deserialize;

pub const DEFAULT_MAX_LINE_LEN: usize = 65_536;
pub const DEFAULT_MAX_LINES: usize = 1_000_000;

/// Source limits enforced while compiling.
///
/// Deserializes from the `[compiler]` table of `rill.toml`; missing keys keep
/// their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Longest accepted source line, in bytes
    pub max_line_len: usize,
    pub max_lines: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}
