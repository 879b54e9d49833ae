//! Configuration module for ipgeo
//!
//! Handles loading and managing configuration from YAML files and environment variables.

use crate::database::FamilySupport;
use crate::database::ip2region::CachePolicy;
use crate::error::{GeoError, Result};
use crate::utils::path;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub global: GlobalConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Preferred locales for localized names, most preferred first
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,

    /// Backends in display order
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

/// One configured backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,

    /// Declared address-family support; derived from the configured files when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<FamilySupport>,

    #[serde(flatten)]
    pub source: BackendSource,
}

/// Database files of a backend, tagged by backend family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendSource {
    /// MaxMind DB files
    Trie {
        city: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        country: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asn: Option<PathBuf>,
        #[serde(default = "default_true")]
        granularity_fallback: bool,
    },
    /// IP2Location BIN files
    RangeIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        v4: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        v6: Option<PathBuf>,
    },
    /// ip2region xdb files
    CompactIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        v4: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        v6: Option<PathBuf>,
        #[serde(default)]
        cache_policy: CachePolicy,
    },
}

impl BackendConfig {
    /// Declared family, or the one implied by the configured files
    pub fn family(&self) -> Option<FamilySupport> {
        if self.family.is_some() {
            return self.family;
        }
        match &self.source {
            BackendSource::Trie { .. } => Some(FamilySupport::Both),
            BackendSource::RangeIndex { v4, v6 } | BackendSource::CompactIndex { v4, v6, .. } => {
                FamilySupport::from_files(v4.is_some(), v6.is_some())
            }
        }
    }

    /// Copy of this backend with every file path made absolute
    pub fn resolved(&self, base: &Path) -> BackendConfig {
        let resolve = |p: &PathBuf| path::resolve_against(base, p);
        let resolve_opt = |p: &Option<PathBuf>| p.as_ref().map(resolve);

        let source = match &self.source {
            BackendSource::Trie { city, country, asn, granularity_fallback } => BackendSource::Trie {
                city: resolve(city),
                country: resolve_opt(country),
                asn: resolve_opt(asn),
                granularity_fallback: *granularity_fallback,
            },
            BackendSource::RangeIndex { v4, v6 } => BackendSource::RangeIndex {
                v4: resolve_opt(v4),
                v6: resolve_opt(v6),
            },
            BackendSource::CompactIndex { v4, v6, cache_policy } => BackendSource::CompactIndex {
                v4: resolve_opt(v4),
                v6: resolve_opt(v6),
                cache_policy: *cache_policy,
            },
        };

        BackendConfig {
            id: self.id.clone(),
            family: self.family,
            source,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub enable_colors: bool,

    /// Output in JSON format
    #[serde(default)]
    pub json: bool,
}

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Verbose logging
    #[serde(default)]
    pub verbose: bool,

    /// Path the configuration was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

// Default value functions
fn default_locales() -> Vec<String> {
    vec!["zh-CN".to_string(), "en".to_string()]
}

fn default_true() -> bool {
    true
}

fn parse_locale_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            id: "geolite2".to_string(),
            family: None,
            source: BackendSource::Trie {
                city: PathBuf::from("GeoLite2/GeoLite2-City.mmdb"),
                country: Some(PathBuf::from("GeoLite2/GeoLite2-Country.mmdb")),
                asn: Some(PathBuf::from("GeoLite2/GeoLite2-ASN.mmdb")),
                granularity_fallback: true,
            },
        },
        BackendConfig {
            id: "dbip".to_string(),
            family: None,
            source: BackendSource::Trie {
                city: PathBuf::from("db-ip/dbip-city-lite.mmdb"),
                country: None,
                asn: None,
                granularity_fallback: false,
            },
        },
        BackendConfig {
            id: "ip2location".to_string(),
            family: None,
            source: BackendSource::RangeIndex {
                v4: Some(PathBuf::from("ip2location/IP2LOCATION-LITE-DB11.BIN")),
                v6: Some(PathBuf::from("ip2location/IP2LOCATION-LITE-DB11.IPV6.BIN")),
            },
        },
        BackendConfig {
            id: "ip2region".to_string(),
            family: None,
            source: BackendSource::CompactIndex {
                v4: Some(PathBuf::from("ip2region/ip2region_v4.xdb")),
                v6: Some(PathBuf::from("ip2region/ip2region_v6.xdb")),
                cache_policy: CachePolicy::default(),
            },
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            output: OutputConfig::default(),
            global: GlobalConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            backends: default_backends(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enable_colors: true,
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location and environment variables
    ///
    /// A default config file is written when none exists yet.
    pub fn load() -> Result<Self> {
        // Ensure directories exist
        path::ensure_app_dirs()?;

        let config_file = path::config_file()?;

        let mut config = if config_file.exists() {
            Self::read_file(&config_file)?
        } else {
            let config = Self::default();
            config.save(&config_file)?;
            log::info!("Wrote default configuration to {:?}", config_file);
            config
        };
        config.global.config_path = Some(config_file);

        // Override with environment variables
        config.apply_env();

        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_from(file: &Path) -> Result<Self> {
        let mut config = Self::read_file(file)?;
        config.global.config_path = Some(file.to_path_buf());
        config.apply_env();
        Ok(config)
    }

    fn read_file(file: &Path) -> Result<Self> {
        let content = fs::read_to_string(file)
            .map_err(|e| GeoError::config(format!("Failed to read config file {:?}: {}", file, e)))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        self.apply_lang(env::var("IPGEO_LANG").ok().as_deref());
    }

    /// Replace the locale chain with a comma-separated list, ignoring empty lists
    fn apply_lang(&mut self, lang: Option<&str>) {
        let locales = lang.map(parse_locale_list).unwrap_or_default();
        if !locales.is_empty() {
            self.database.locales = locales;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)
            .map_err(|e| GeoError::config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Backends with paths resolved against the database directory
    pub fn resolved_backends(&self) -> Result<Vec<BackendConfig>> {
        let base = path::data_dir()?;
        Ok(self
            .database
            .backends
            .iter()
            .map(|backend| backend.resolved(&base))
            .collect())
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.database.backends.iter().map(|b| b.id.clone()).collect()
    }
}
