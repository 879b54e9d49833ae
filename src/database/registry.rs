//! Backend registry - holds every configured backend and its opened handle
//!
//! The registry is built once at startup. Each backend is opened exactly once; a
//! backend whose files fail to open stays registered with no handle and is reported
//! as unavailable for every query, without affecting the others.

use crate::config::BackendConfig;
use crate::database::{AddressFamily, Backend, BackendKind, DatabaseFactory, FamilySupport};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One registered backend
#[derive(Clone)]
pub struct BackendDescriptor {
    pub id: String,
    pub kind: BackendKind,
    pub family: FamilySupport,
    /// Opened handle; `None` means the backend failed to load
    pub handle: Option<Arc<dyn Backend>>,
    /// Why the backend failed to load
    pub load_error: Option<String>,
}

impl BackendDescriptor {
    pub fn loaded(id: impl Into<String>, family: FamilySupport, handle: Arc<dyn Backend>) -> Self {
        Self {
            id: id.into(),
            kind: handle.kind(),
            family,
            handle: Some(handle),
            load_error: None,
        }
    }

    pub fn unavailable(
        id: impl Into<String>,
        kind: BackendKind,
        family: FamilySupport,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            family,
            handle: None,
            load_error: Some(error.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.handle.is_some()
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("family", &self.family)
            .field("loaded", &self.handle.is_some())
            .field("load_error", &self.load_error)
            .finish()
    }
}

/// Registry of configured backends, in configuration order
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<BackendDescriptor>,
    by_id: HashMap<String, usize>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every configured backend
    ///
    /// Never fails as a whole: a backend that cannot be opened is recorded as unavailable.
    /// `locales` is the name lookup chain handed to trie backends.
    pub fn open(configs: &[BackendConfig], locales: &[String]) -> Self {
        let mut registry = Self::new();

        for config in configs {
            if registry.by_id.contains_key(&config.id) {
                log::warn!("Duplicate backend id {:?} ignored", config.id);
                continue;
            }

            let kind = DatabaseFactory::kind_of(&config.source);
            let descriptor = match config.family() {
                None => {
                    log::warn!("Backend {} has no database files configured", config.id);
                    BackendDescriptor::unavailable(
                        &config.id,
                        kind,
                        FamilySupport::Both,
                        "no database files configured",
                    )
                }
                Some(family) => match DatabaseFactory::open(config, locales) {
                    Ok(handle) => {
                        log::info!("Backend {} ready ({}, {})", config.id, kind, family);
                        BackendDescriptor::loaded(&config.id, family, handle)
                    }
                    Err(e) => {
                        log::warn!("Backend {} unavailable: {}", config.id, e);
                        BackendDescriptor::unavailable(&config.id, kind, family, e.to_string())
                    }
                },
            };

            registry.register(descriptor);
        }

        registry
    }

    /// Add a backend; an already registered id is replaced
    pub fn register(&mut self, descriptor: BackendDescriptor) {
        match self.by_id.get(&descriptor.id) {
            Some(&index) => self.backends[index] = descriptor,
            None => {
                self.by_id.insert(descriptor.id.clone(), self.backends.len());
                self.backends.push(descriptor);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&BackendDescriptor> {
        self.by_id.get(id).map(|&index| &self.backends[index])
    }

    /// Opened handle for a backend, `None` if unknown or unavailable
    pub fn handle(&self, id: &str) -> Option<Arc<dyn Backend>> {
        self.get(id).and_then(|d| d.handle.clone())
    }

    /// Loaded backends that declare support for `family`
    pub fn available_backends(&self, family: AddressFamily) -> Vec<&BackendDescriptor> {
        self.backends
            .iter()
            .filter(|d| d.is_available() && d.family.supports(family))
            .collect()
    }

    pub fn descriptors(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    /// All backend ids in configuration order
    pub fn ids(&self) -> Vec<String> {
        self.backends.iter().map(|d| d.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendSource;
    use crate::database::ip2region::CachePolicy;
    use crate::database::testutil::{BinFixture, BinRow, XdbFixture};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn locales() -> Vec<String> {
        vec!["zh-CN".to_string(), "en".to_string()]
    }

    fn fixture_configs(dir: &TempDir) -> Vec<BackendConfig> {
        let bin = dir.path().join("IP2LOCATION.BIN");
        BinFixture::v4(vec![BinRow::v4("0.0.0.0", "US", "United States", "", "", "", "", "")])
            .write_to(&bin);

        let xdb_v4 = dir.path().join("ip2region_v4.xdb");
        XdbFixture::new(&[("0.0.0.0", "255.255.255.255", "美国|0|0|0")]).write_to(&xdb_v4);
        let xdb_v6 = dir.path().join("ip2region_v6.xdb");
        XdbFixture::new(&[("::", "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff", "0|0|0|0")])
            .write_to(&xdb_v6);

        vec![
            BackendConfig {
                id: "geolite2".to_string(),
                family: None,
                source: BackendSource::Trie {
                    city: dir.path().join("missing-City.mmdb"),
                    country: None,
                    asn: None,
                    granularity_fallback: true,
                },
            },
            BackendConfig {
                id: "ip2location".to_string(),
                family: None,
                source: BackendSource::RangeIndex { v4: Some(bin), v6: None },
            },
            BackendConfig {
                id: "ip2region".to_string(),
                family: None,
                source: BackendSource::CompactIndex {
                    v4: Some(xdb_v4),
                    v6: Some(xdb_v6),
                    cache_policy: CachePolicy::File,
                },
            },
        ]
    }

    #[test]
    fn test_open_with_one_missing_file() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::open(&fixture_configs(&dir), &locales());

        assert_eq!(registry.ids(), vec!["geolite2", "ip2location", "ip2region"]);

        let geolite = registry.get("geolite2").unwrap();
        assert!(!geolite.is_available());
        assert!(geolite.load_error.is_some());
        assert!(registry.handle("geolite2").is_none());

        assert!(registry.handle("ip2location").is_some());
        assert_eq!(registry.get("ip2location").unwrap().family, FamilySupport::V4);
        assert_eq!(registry.get("ip2region").unwrap().family, FamilySupport::Both);
    }

    #[test]
    fn test_available_backends_by_family() {
        let dir = TempDir::new().unwrap();
        let registry = BackendRegistry::open(&fixture_configs(&dir), &locales());

        let v4: Vec<_> = registry
            .available_backends(AddressFamily::V4)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(v4, vec!["ip2location", "ip2region"]);

        let v6: Vec<_> = registry
            .available_backends(AddressFamily::V6)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(v6, vec!["ip2region"]);
    }

    #[test]
    fn test_duplicate_and_empty_configs() {
        let configs = vec![
            BackendConfig {
                id: "empty".to_string(),
                family: None,
                source: BackendSource::RangeIndex { v4: None, v6: None },
            },
            BackendConfig {
                id: "empty".to_string(),
                family: None,
                source: BackendSource::Trie {
                    city: PathBuf::from("/nonexistent.mmdb"),
                    country: None,
                    asn: None,
                    granularity_fallback: true,
                },
            },
        ];
        let registry = BackendRegistry::open(&configs, &locales());
        assert_eq!(registry.len(), 1);

        let descriptor = registry.get("empty").unwrap();
        assert_eq!(descriptor.kind, BackendKind::RangeIndex);
        assert_eq!(descriptor.load_error.as_deref(), Some("no database files configured"));
    }
}
