use std::io;
use std::path::{Path, PathBuf};

use crate::canvas::Color;
use crate::components::history::DEFAULT_HISTORY_SIZE;
use crate::compositor::CHECKER_SIZE;

/// Engine settings that persist across sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// Grid edge used when no size is given
    pub default_grid_size: usize,
    /// Fill color of new documents
    pub default_fill: Color,
    /// Checkerboard square size for text previews
    pub checker_size: usize,
    /// Rhai operation budget per script run
    pub script_max_operations: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_HISTORY_SIZE,
            default_grid_size: 32,
            default_fill: Color::Transparent,
            checker_size: CHECKER_SIZE,
            script_max_operations: 50_000_000,
        }
    }
}

impl EngineSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/gridpaint/gridpaint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\GridPaint\gridpaint_settings.cfg
    /// On macOS:   ~/Library/Application Support/GridPaint/gridpaint_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("gridpaint");
            Some(config_dir.join("gridpaint_settings.cfg"))
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            Some(PathBuf::from(appdata).join("GridPaint").join("gridpaint_settings.cfg"))
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("GridPaint")
                    .join("gridpaint_settings.cfg"),
            )
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("gridpaint_settings.cfg")))
        }
    }

    /// `key=value` lines, one per setting.
    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             default_grid_size={}\n\
             default_fill={}\n\
             checker_size={}\n\
             script_max_operations={}\n",
            self.max_undo_steps,
            self.default_grid_size,
            self.default_fill.to_hex().unwrap_or_default(),
            self.checker_size,
            self.script_max_operations,
        )
    }

    /// Parse `key=value` lines. Unknown keys and bad values keep defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(DEFAULT_HISTORY_SIZE).max(1);
                }
                "default_grid_size" => {
                    s.default_grid_size = val.parse().unwrap_or(32);
                }
                "default_fill" => {
                    s.default_fill = Color::from_hex(val).unwrap_or_default();
                }
                "checker_size" => {
                    s.checker_size = val.parse().unwrap_or(CHECKER_SIZE).max(1);
                }
                "script_max_operations" => {
                    s.script_max_operations = val.parse().unwrap_or(50_000_000);
                }
                other => {
                    tracing::debug!("Ignoring unknown setting '{}'", other);
                }
            }
        }
        s
    }

    /// Save settings to `settings_path()` and return where they went.
    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::settings_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no settings directory on this platform")
        })?;
        self.save_to(&path)?;
        tracing::info!("Settings saved to {}", path.display());
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let s = EngineSettings {
            max_undo_steps: 12,
            default_grid_size: 64,
            default_fill: Color::rgb(1, 2, 3),
            checker_size: 2,
            script_max_operations: 1000,
        };
        assert_eq!(EngineSettings::from_config_str(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let s = EngineSettings::from_config_str(
            "max_undo_steps=lots\n# comment\ndefault_fill=#zzzzzz\nunknown=1\nchecker_size=0\n",
        );
        assert_eq!(s.max_undo_steps, DEFAULT_HISTORY_SIZE);
        assert_eq!(s.default_fill, Color::Transparent);
        assert_eq!(s.checker_size, 1);
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("gridpaint_settings.cfg");
        let s = EngineSettings { max_undo_steps: 7, ..EngineSettings::default() };
        s.save_to(&path).unwrap();
        assert_eq!(EngineSettings::load_from(&path), s);
        let missing = dir.path().join("missing.cfg");
        assert_eq!(EngineSettings::load_from(&missing), EngineSettings::default());
    }
}
