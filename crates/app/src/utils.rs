use anyhow::{Context, Result};
use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com.local", "Battery Research", "battery_research")
        .map(|proj| proj.config_dir().join("settings.json"))
}

/// Read settings from a specific file
pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let settings = serde_json::from_slice::<AppSettings>(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(settings)
}

/// Load settings from disk or return defaults.
///
/// The flag is true when a settings file was found and parsed.
pub fn load_settings_or_default() -> (AppSettings, bool) {
    let Some(path) = config_path() else {
        return (AppSettings::default(), false);
    };
    if !path.exists() {
        return (AppSettings::default(), false);
    }
    match load_settings_from(&path) {
        Ok(settings) => (settings, true),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable settings file");
            (AppSettings::default(), false)
        }
    }
}

/// Write settings to a specific file, creating parent directories
pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Save settings to the default location
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    let path = config_path().context("no config directory on this platform")?;
    save_settings_to(&path, settings)
}
