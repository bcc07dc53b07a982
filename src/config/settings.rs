//! Host settings: auto-refresh preferences and the connected user's name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::SrError;

const SETTINGS_FILE_VERSION: u32 = 1;

pub const MIN_REFRESH_INTERVAL_SECS: u32 = 5;
pub const MAX_REFRESH_INTERVAL_SECS: u32 = 300;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u32 = 30;

/// Persisted operator preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_refresh_enabled: bool,
    pub auto_refresh_interval_secs: u32,
    pub user_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_refresh_enabled: false,
            auto_refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            user_name: String::new(),
        }
    }
}

/// Get/set access to host settings. No contract beyond get/set.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;
    fn update(&self, settings: Settings) -> Result<(), SrError>;

    fn auto_refresh_enabled(&self) -> bool {
        self.get().auto_refresh_enabled
    }

    fn auto_refresh_interval_secs(&self) -> u32 {
        self.get().auto_refresh_interval_secs
    }

    fn user_name(&self) -> String {
        self.get().user_name
    }

    fn set_auto_refresh_enabled(&self, enabled: bool) -> Result<(), SrError> {
        let mut settings = self.get();
        settings.auto_refresh_enabled = enabled;
        self.update(settings)
    }

    /// Rejects intervals outside `5..=300` seconds.
    fn set_auto_refresh_interval_secs(&self, secs: u32) -> Result<(), SrError> {
        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS).contains(&secs) {
            return Err(SrError::Configuration(format!(
                "refresh interval must be between {MIN_REFRESH_INTERVAL_SECS} and \
                 {MAX_REFRESH_INTERVAL_SECS} seconds, got {secs}"
            )));
        }
        let mut settings = self.get();
        settings.auto_refresh_interval_secs = secs;
        self.update(settings)
    }

    fn set_user_name(&self, name: &str) -> Result<(), SrError> {
        let mut settings = self.get();
        settings.user_name = name.to_string();
        self.update(settings)
    }
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> Settings {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn update(&self, settings: Settings) -> Result<(), SrError> {
        let mut guard = self
            .settings
            .write()
            .map_err(|_| SrError::Configuration("settings lock poisoned".into()))?;
        *guard = settings;
        Ok(())
    }
}

/// Settings persisted to `settings.toml`, cached in memory.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    cached: RwLock<Settings>,
}

impl FileSettingsStore {
    /// Open (or lazily create) the settings file. A missing file yields defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SrError> {
        let path = path.into();
        let cached = Self::read_file(&path)?;
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn open_in(dir: &Path) -> Result<Self, SrError> {
        Self::open(dir.join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<Settings, SrError> {
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Settings::default())
            }
            Err(err) => return Err(SrError::Io(err)),
        };
        let file: SettingsFile = toml::from_str(&raw).map_err(|e| {
            SrError::Configuration(format!("invalid settings file {}: {e}", path.display()))
        })?;
        if file.version != SETTINGS_FILE_VERSION {
            return Err(SrError::Configuration(format!(
                "unsupported settings file version {} at {}",
                file.version,
                path.display()
            )));
        }
        Ok(file.settings)
    }

    fn write_file(&self, settings: &Settings) -> Result<(), SrError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = SettingsFile {
            version: SETTINGS_FILE_VERSION,
            settings: settings.clone(),
        };
        let serialized = toml::to_string(&file)
            .map_err(|e| SrError::Configuration(format!("cannot serialize settings: {e}")))?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self) -> Settings {
        self.cached
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn update(&self, settings: Settings) -> Result<(), SrError> {
        self.write_file(&settings)?;
        let mut guard = self
            .cached
            .write()
            .map_err(|_| SrError::Configuration("settings lock poisoned".into()))?;
        *guard = settings;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    version: u32,
    settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::open_in(dir.path()).unwrap();
        assert_eq!(store.get(), Settings::default());
        assert!(!store.auto_refresh_enabled());
        assert_eq!(store.auto_refresh_interval_secs(), 30);
    }

    #[test]
    fn updates_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::open_in(dir.path()).unwrap();
        store.set_auto_refresh_enabled(true).unwrap();
        store.set_auto_refresh_interval_secs(15).unwrap();
        store.set_user_name("streamer").unwrap();

        let reopened = FileSettingsStore::open_in(dir.path()).unwrap();
        assert!(reopened.auto_refresh_enabled());
        assert_eq!(reopened.auto_refresh_interval_secs(), 15);
        assert_eq!(reopened.user_name(), "streamer");
    }

    #[test]
    fn interval_outside_range_is_rejected() {
        let store = MemorySettingsStore::new();
        assert!(store.set_auto_refresh_interval_secs(0).is_err());
        assert!(store.set_auto_refresh_interval_secs(301).is_err());
        assert!(store.set_auto_refresh_interval_secs(5).is_ok());
        assert_eq!(store.auto_refresh_interval_secs(), 5);
    }

    #[test]
    fn garbage_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            FileSettingsStore::open(&path),
            Err(SrError::Configuration(_))
        ));
    }
}
