//! CLI configuration.
//!
//! # Responsibility
//! - Resolve the data directory and the paths derived from it.
//! - Merge `<data_dir>/config.toml` with command-line overrides.
//!
//! # Invariants
//! - Relative paths in the config file resolve against the data directory.
//! - A missing config file means defaults, never an error.
//! - ATF lookups never leave `atf_dir`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = ".clee";
const DEFAULT_DB_FILE: &str = "grist.db";
const DEFAULT_ATF_DIR: &str = "atf";
const DEFAULT_LOG_DIR: &str = "logs";

/// On-disk config file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    atf_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    hide_identifier_detail: Option<bool>,
}

/// Effective runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub atf_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub hide_identifier_detail: bool,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub show_identifiers: bool,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            db_path: data_dir.join(DEFAULT_DB_FILE),
            atf_dir: data_dir.join(DEFAULT_ATF_DIR),
            log_dir: data_dir.join(DEFAULT_LOG_DIR),
            log_level: clee_core::default_log_level().to_string(),
            hide_identifier_detail: true,
            data_dir,
        }
    }

    /// Loads the effective configuration.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let data_dir = match &overrides.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let mut config = Self::with_data_dir(data_dir);

        let file_path = config.data_dir.join(CONFIG_FILE_NAME);
        if file_path.exists() {
            let raw = std::fs::read_to_string(&file_path)
                .with_context(|| format!("failed to read `{}`", file_path.display()))?;
            config
                .apply_file(&raw)
                .with_context(|| format!("invalid config file `{}`", file_path.display()))?;
        }

        if let Some(db_path) = &overrides.db_path {
            config.db_path = db_path.clone();
        }
        if let Some(level) = &overrides.log_level {
            config.log_level = level.clone();
        }
        if overrides.show_identifiers {
            config.hide_identifier_detail = false;
        }
        Ok(config)
    }

    fn apply_file(&mut self, raw: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(raw)?;
        if let Some(path) = file.db_path {
            self.db_path = resolve(&self.data_dir, path);
        }
        if let Some(path) = file.atf_dir {
            self.atf_dir = resolve(&self.data_dir, path);
        }
        if let Some(path) = file.log_dir {
            self.log_dir = resolve(&self.data_dir, path);
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if let Some(hide) = file.hide_identifier_detail {
            self.hide_identifier_detail = hide;
        }
        Ok(())
    }

    /// Raw transliteration file for `uid`; `None` unless `uid` is a single
    /// plain file-name component.
    pub fn atf_path(&self, uid: &str) -> Option<PathBuf> {
        let mut components = Path::new(uid).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.atf_dir.join(format!("{uid}.atf"))),
            _ => None,
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine the home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, Overrides, CONFIG_FILE_NAME};
    use std::path::PathBuf;

    #[test]
    fn defaults_live_under_data_dir() {
        let config = AppConfig::with_data_dir(PathBuf::from("/data/clee"));
        assert_eq!(config.db_path, PathBuf::from("/data/clee/grist.db"));
        assert_eq!(config.atf_dir, PathBuf::from("/data/clee/atf"));
        assert!(config.hide_identifier_detail);
        assert_eq!(
            config.atf_path("P1"),
            Some(PathBuf::from("/data/clee/atf/P1.atf"))
        );
    }

    #[test]
    fn atf_path_stays_inside_atf_dir() {
        let config = AppConfig::with_data_dir(PathBuf::from("/data/clee"));
        assert_eq!(config.atf_path("../x"), None);
        assert_eq!(config.atf_path("/etc/passwd"), None);
        assert_eq!(config.atf_path(".."), None);
        assert_eq!(config.atf_path(""), None);
        assert_eq!(config.atf_path("atf/P1"), None);
    }

    #[test]
    fn config_file_and_flags_are_merged() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "db_path = \"other.db\"\nlog_level = \"warn\"\nhide_identifier_detail = true\n",
        )
        .expect("write config");

        let config = AppConfig::load(&Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            show_identifiers: true,
            ..Overrides::default()
        })
        .expect("config should load");

        assert_eq!(config.db_path, dir.path().join("other.db"));
        assert_eq!(config.log_level, "warn");
        assert!(!config.hide_identifier_detail);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "colour = \"red\"\n")
            .expect("write config");
        let result = AppConfig::load(&Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            ..Overrides::default()
        });
        assert!(result.is_err());
    }
}
