//! Path utilities for configuration and database files

use crate::error::{GeoError, Result};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "ipgeo";

/// Directories ipgeo reads from
///
/// Each is taken from the first non-empty environment override, else from the
/// platform directory (`$XDG_CONFIG_HOME`, `$XDG_DATA_HOME` or their defaults)
/// joined with `ipgeo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppDir {
    /// Holds `config.yaml`
    Config,
    /// Base for relative database paths
    Data,
}

impl AppDir {
    fn overrides(self) -> [&'static str; 2] {
        match self {
            AppDir::Config => ["IPGEO_CONFIG_HOME", "IPGEO_HOME"],
            AppDir::Data => ["IPGEO_DB_HOME", "IPGEO_HOME"],
        }
    }

    fn platform_dir(self) -> Option<PathBuf> {
        match self {
            AppDir::Config => dirs::config_dir(),
            AppDir::Data => dirs::data_dir(),
        }
    }

    pub fn resolve(self) -> Result<PathBuf> {
        self.resolve_with(|name| env::var_os(name), self.platform_dir())
    }

    fn resolve_with<F>(self, var: F, platform_dir: Option<PathBuf>) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let overridden = self
            .overrides()
            .iter()
            .filter_map(|&name| var(name))
            .find(|value| !value.is_empty())
            .map(|value| expand_tilde(Path::new(&value)));

        overridden
            .or_else(|| platform_dir.map(|dir| dir.join(APP_NAME)))
            .ok_or_else(|| GeoError::config(format!("cannot locate the {} directory", self)))
    }
}

impl fmt::Display for AppDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppDir::Config => write!(f, "configuration"),
            AppDir::Data => write!(f, "database"),
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    AppDir::Config.resolve()
}

pub fn data_dir() -> Result<PathBuf> {
    AppDir::Data.resolve()
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.yaml"))
}

/// Create `path` and its parents when missing
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path)
            .map_err(|e| GeoError::config(format!("cannot create {:?}: {}", path, e)))?;
    }
    Ok(())
}

pub fn ensure_app_dirs() -> Result<()> {
    ensure_dir(&config_dir()?)?;
    ensure_dir(&data_dir()?)
}

/// Replace a leading `~` component with the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Expand tilde, then join relative paths onto `base`
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}
