use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub chunking: Option<ChunkingConfig>,
    pub context: Option<ContextConfig>,
    pub layout: Option<LayoutConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_tokens_per_part: Option<usize>,
    pub overlap_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    pub append_abstract: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Fraction of page height above which words count as running header.
    pub header_margin: Option<f32>,
    /// Fraction of page height below which words count as running footer.
    pub footer_margin: Option<f32>,
}

/// Platform config directory path: `<config_dir>/outcrop/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("outcrop").join("config.toml"))
}

/// Load config by cascading CWD `.outcrop.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".outcrop.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        chunking: Some(ChunkingConfig {
            max_tokens_per_part: overlay
                .chunking
                .as_ref()
                .and_then(|c| c.max_tokens_per_part)
                .or_else(|| base.chunking.as_ref().and_then(|c| c.max_tokens_per_part)),
            overlap_percentage: overlay
                .chunking
                .as_ref()
                .and_then(|c| c.overlap_percentage)
                .or_else(|| base.chunking.as_ref().and_then(|c| c.overlap_percentage)),
        }),
        context: Some(ContextConfig {
            append_abstract: overlay
                .context
                .as_ref()
                .and_then(|c| c.append_abstract)
                .or_else(|| base.context.as_ref().and_then(|c| c.append_abstract)),
        }),
        layout: Some(LayoutConfig {
            header_margin: overlay
                .layout
                .as_ref()
                .and_then(|l| l.header_margin)
                .or_else(|| base.layout.as_ref().and_then(|l| l.header_margin)),
            footer_margin: overlay
                .layout
                .as_ref()
                .and_then(|l| l.footer_margin)
                .or_else(|| base.layout.as_ref().and_then(|l| l.footer_margin)),
        }),
    }
}
