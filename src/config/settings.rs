use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.notebook.app/v1";

pub const BASE_URL_VAR: &str = "NBPM_BASE_URL";
pub const APP_VERSION_VAR: &str = "NBPM_APP_VERSION";
pub const DATA_DIR_VAR: &str = "NBPM_DATA_DIR";

/// Config file location.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Everything needed to construct the package-manager client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Registry API root, without a trailing slash.
    pub base_url: String,
    /// App version packages are installed for. Sent to the registry when set.
    pub app_version: Option<String>,
    /// Root for installed packages.
    pub data_dir: PathBuf,
    pub timeout: Option<Duration>,
}

// Internal struct for TOML deserialization
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    base_url: Option<String>,
    app_version: Option<String>,
    data_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl Settings {
    /// Get the config file path (~/.config/nbpm/config.toml).
    pub fn global_path() -> Option<PathBuf> {
        let dirs = xdg::BaseDirectories::with_prefix("nbpm");
        dirs.get_config_home().map(|p| p.join(CONFIG_FILENAME))
    }

    /// Get the default data directory (~/.local/share/nbpm).
    pub fn default_data_dir() -> Option<PathBuf> {
        let dirs = xdg::BaseDirectories::with_prefix("nbpm");
        dirs.get_data_home()
    }

    /// Load settings: defaults, then the config file, then the process environment.
    pub fn load() -> Result<Self> {
        let raw = match Self::global_path() {
            Some(path) if path.exists() => Self::read_file(&path)?,
            _ => RawSettings::default(),
        };
        Self::resolve(raw, |key| std::env::var(key).ok(), Self::default_data_dir())
    }

    /// Parse settings from TOML content, layering `env` on top.
    pub fn parse(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
        default_data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let raw = parse_raw(content, Path::new(CONFIG_FILENAME))?;
        Self::resolve(raw, env, default_data_dir)
    }

    fn read_file(path: &Path) -> Result<RawSettings> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        parse_raw(&content, path)
    }

    fn resolve(
        raw: RawSettings,
        env: impl Fn(&str) -> Option<String>,
        default_data_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let base_url = var(BASE_URL_VAR)
            .or(raw.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let data_dir = var(DATA_DIR_VAR)
            .map(PathBuf::from)
            .or(raw.data_dir)
            .or(default_data_dir)
            .ok_or(Error::NoDataDir)?;

        Ok(Settings {
            base_url: base_url.trim_end_matches('/').to_string(),
            app_version: var(APP_VERSION_VAR).or(raw.app_version),
            data_dir,
            timeout: raw.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Directory holding installed package archives and the ledger.
    pub fn packages_dir(&self) -> PathBuf {
        self.data_dir.join("packages")
    }
}

fn parse_raw(content: &str, path: &Path) -> Result<RawSettings> {
    toml::from_str(content).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn data_dir() -> Option<PathBuf> {
        Some(PathBuf::from("/data/nbpm"))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::parse("", no_env, data_dir()).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.app_version, None);
        assert_eq!(settings.data_dir, PathBuf::from("/data/nbpm"));
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.packages_dir(), PathBuf::from("/data/nbpm/packages"));
    }

    #[test]
    fn test_file_values() {
        let content = r#"
base_url = "https://registry.example.com/v2/"
app_version = "5.9.0"
data_dir = "/srv/notes"
timeout_secs = 30
"#;
        let settings = Settings::parse(content, no_env, data_dir()).unwrap();
        assert_eq!(settings.base_url, "https://registry.example.com/v2");
        assert_eq!(settings.app_version.as_deref(), Some("5.9.0"));
        assert_eq!(settings.data_dir, PathBuf::from("/srv/notes"));
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_env_overrides_file() {
        let content = r#"
base_url = "https://file.example.com"
app_version = "5.0.0"
"#;
        let env: HashMap<&str, &str> = [
            (BASE_URL_VAR, "http://localhost:8080"),
            (APP_VERSION_VAR, "6.0.0"),
            (DATA_DIR_VAR, "/tmp/nbpm"),
        ]
        .into_iter()
        .collect();

        let settings =
            Settings::parse(content, |key| env.get(key).map(|v| v.to_string()), data_dir())
                .unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.app_version.as_deref(), Some("6.0.0"));
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/nbpm"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let settings =
            Settings::parse("", |_| Some("  ".to_string()), data_dir()).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.app_version, None);
    }

    #[test]
    fn test_missing_data_dir() {
        let result = Settings::parse("", no_env, None);
        assert!(matches!(result, Err(Error::NoDataDir)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Settings::parse("registry = \"x\"", no_env, data_dir());
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_load_file_from_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "app_version = \"5.1.0\"\n").unwrap();

        let raw = Settings::read_file(&path).unwrap();
        assert_eq!(raw.app_version.as_deref(), Some("5.1.0"));
    }
}
