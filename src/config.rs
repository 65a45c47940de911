use crate::backdrop::{default_blobs, default_nebula, BlobConfig, NebulaConfig};
use crate::color::Theme;
use crate::error::{FieldError, Result};
use crate::settings::FieldSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete application configuration for export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Theme the field starts in (also the persisted preference)
    pub theme: Theme,
    /// All field settings
    pub settings: FieldSettings,
    /// Gradient blobs behind the field
    pub blobs: Vec<BlobConfig>,
    /// Gradient haze under the blobs; null turns it off
    pub nebula: Option<NebulaConfig>,
    /// Fixed random seed; None picks a fresh one per run
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Default location: `<config_dir>/ambient-field/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ambient-field").join("config.json"))
    }

    /// Export config to a JSON file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FieldError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| FieldError::io(path, e))?;
        Ok(())
    }

    /// Import config from a JSON file; out-of-range values are clamped
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FieldError::io(path, e))?;
        let mut config: AppConfig = serde_json::from_str(&content)?;
        config.settings.sanitize();
        Ok(config)
    }

    /// Load if the file exists, otherwise fall back to defaults.
    /// A broken file is logged and ignored rather than aborting startup.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("ignoring config: {}", err);
                Self::default()
            }
        }
    }

    /// Write only the theme preference into the config at `path`
    pub fn persist_theme(path: &Path, theme: Theme) -> Result<()> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.theme = theme;
        config.save_to_file(path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            theme: Theme::default(),
            settings: FieldSettings::default(),
            blobs: default_blobs(),
            nebula: Some(default_nebula()),
            seed: None,
        }
    }
}
