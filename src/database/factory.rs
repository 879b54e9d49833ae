//! Factory for opening backend instances
//!
//! This module maps a configured backend source onto the matching adapter.

use super::ip2location::IP2LocationDatabase;
use super::ip2region::IP2RegionDatabase;
use super::maxmind::{MaxMindDatabase, MergePolicy};
use super::traits::Backend;
use super::types::BackendKind;
use crate::config::{BackendConfig, BackendSource};
use crate::error::Result;
use std::sync::Arc;

/// Factory for opening backend instances
pub struct DatabaseFactory;

impl DatabaseFactory {
    pub fn kind_of(source: &BackendSource) -> BackendKind {
        match source {
            BackendSource::Trie { .. } => BackendKind::Trie,
            BackendSource::RangeIndex { .. } => BackendKind::RangeIndex,
            BackendSource::CompactIndex { .. } => BackendKind::CompactIndex,
        }
    }

    /// Open the adapter for a configured backend
    ///
    /// `locales` is the name lookup chain used when merging trie records.
    pub fn open(config: &BackendConfig, locales: &[String]) -> Result<Arc<dyn Backend>> {
        match &config.source {
            BackendSource::Trie {
                city,
                country,
                asn,
                granularity_fallback,
            } => Ok(Arc::new(MaxMindDatabase::open(
                city,
                country.as_deref(),
                asn.as_deref(),
                MergePolicy::new(*granularity_fallback, locales),
            )?)),
            BackendSource::RangeIndex { v4, v6 } => Ok(Arc::new(IP2LocationDatabase::open(
                v4.as_deref(),
                v6.as_deref(),
            )?)),
            BackendSource::CompactIndex { v4, v6, cache_policy } => Ok(Arc::new(
                IP2RegionDatabase::open(v4.as_deref(), v6.as_deref(), *cache_policy)?,
            )),
        }
    }
}
