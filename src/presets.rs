use crate::error::{FieldError, Result};
use crate::settings::FieldSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named preset containing field settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub settings: FieldSettings,
}

impl Preset {
    pub fn new(name: impl Into<String>, description: impl Into<String>, settings: FieldSettings) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            settings,
        }
    }
}

/// Manager for loading and saving presets
pub struct PresetManager {
    /// Built-in presets that ship with the app
    pub builtin: Vec<Preset>,
    /// User-created presets loaded from disk
    pub user: Vec<Preset>,
    /// Where user presets live; None when no config dir is known
    dir: Option<PathBuf>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetManager {
    pub fn new() -> Self {
        Self::with_dir(Self::presets_dir())
    }

    /// Manager reading and writing user presets under `dir`
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        let mut manager = Self {
            builtin: builtin_presets(),
            user: Vec::new(),
            dir,
        };
        manager.load_user_presets();
        manager
    }

    /// Default presets directory path
    fn presets_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ambient-field").join("presets"))
    }

    /// Load user presets from disk; unreadable files are skipped
    fn load_user_presets(&mut self) {
        let Some(dir) = self.dir.as_ref().filter(|d| d.exists()) else {
            return;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("cannot read presets in {}: {}", dir.display(), err);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match read_preset(&path) {
                Ok(preset) => self.user.push(preset),
                Err(err) => log::warn!("skipping preset: {}", err),
            }
        }
        self.user.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("loaded {} user presets", self.user.len());
    }

    /// Save a preset to disk, replacing a user preset of the same name
    pub fn save_preset(&mut self, preset: Preset) -> Result<PathBuf> {
        let dir = self.dir.clone().ok_or(FieldError::NoConfigDir)?;
        fs::create_dir_all(&dir).map_err(|e| FieldError::io(&dir, e))?;

        let path = dir.join(format!("{}.json", file_stem(&preset.name)));
        let json = serde_json::to_string_pretty(&preset)?;
        fs::write(&path, json).map_err(|e| FieldError::io(&path, e))?;

        match self.user.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.user.push(preset),
        }
        Ok(path)
    }

    /// Get all presets (builtin + user)
    pub fn all_presets(&self) -> impl Iterator<Item = &Preset> {
        self.builtin.iter().chain(self.user.iter())
    }

    /// Find a preset by name
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.all_presets().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Like `find`, but an unknown name is an error
    pub fn require(&self, name: &str) -> Result<&Preset> {
        self.find(name).ok_or_else(|| FieldError::UnknownPreset(name.to_string()))
    }

    /// Get preset names for display
    pub fn preset_names(&self) -> Vec<&str> {
        self.all_presets().map(|p| p.name.as_str()).collect()
    }

    /// Preset at `index` in display order, wrapping around
    pub fn get_wrapped(&self, index: usize) -> Option<&Preset> {
        let count = self.builtin.len() + self.user.len();
        if count == 0 {
            return None;
        }
        self.all_presets().nth(index % count)
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_preset(path: &Path) -> Result<Preset> {
    let content = fs::read_to_string(path).map_err(|e| FieldError::io(path, e))?;
    let mut preset: Preset = serde_json::from_str(&content)?;
    preset.settings.sanitize();
    Ok(preset)
}

/// Preset name reduced to a safe file name
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn builtin_presets() -> Vec<Preset> {
    vec![
        // Ambient - default settings
        Preset::new("Ambient", "Slow flow with a light connector web", FieldSettings::default()),
        // Dense Web - many short links
        Preset::new(
            "Dense Web",
            "Packed field with a wide connection radius",
            FieldSettings {
                density_divisor: 6.0,
                connect_radius: 140.0,
                curve_jitter: 6.0,
                ..Default::default()
            },
        ),
        // Calm - weak pointer, long memory
        Preset::new(
            "Calm",
            "Gentle drift that barely reacts to the pointer",
            FieldSettings {
                velocity_retain: 0.97,
                repel_factor: 0.03,
                decay_rate: 0.02,
                curve_jitter: 2.0,
                ..Default::default()
            },
        ),
        // Sparse - few particles, no web
        Preset::new(
            "Sparse",
            "Scattered particles with trails only",
            FieldSettings {
                density_divisor: 30.0,
                max_particles: 40,
                draw_connectors: false,
                ..Default::default()
            },
        ),
        // Storm - fine turbulent flow, strong pointer
        Preset::new(
            "Storm",
            "Tight flow cells and a strong pointer push",
            FieldSettings {
                cell_size: 8.0,
                velocity_retain: 0.7,
                influence_radius: 300.0,
                repel_factor: 0.3,
                decay_rate: 0.15,
                curve_jitter: 25.0,
                ..Default::default()
            },
        ),
        // Minimal - dots only
        Preset::new(
            "Minimal",
            "Bare particles without trails, links or backdrop",
            FieldSettings {
                draw_trails: false,
                draw_connectors: false,
                show_blobs: false,
                ..Default::default()
            },
        ),
    ]
}
