//! Type definitions for the database module
//!
//! This module contains common types used across all backend implementations:
//! address families, backend kinds, the raw per-family records produced by the
//! adapters, and the normalized record and outcome types handed to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Address family of a classified IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Address families a backend declares support for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilySupport {
    V4,
    V6,
    Both,
}

impl FamilySupport {
    pub fn supports(self, family: AddressFamily) -> bool {
        matches!(
            (self, family),
            (FamilySupport::Both, _)
                | (FamilySupport::V4, AddressFamily::V4)
                | (FamilySupport::V6, AddressFamily::V6)
        )
    }

    /// Family support implied by which per-family files are configured
    pub fn from_files(has_v4: bool, has_v6: bool) -> Option<Self> {
        match (has_v4, has_v6) {
            (true, true) => Some(FamilySupport::Both),
            (true, false) => Some(FamilySupport::V4),
            (false, true) => Some(FamilySupport::V6),
            (false, false) => None,
        }
    }
}

impl fmt::Display for FamilySupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FamilySupport::V4 => write!(f, "v4"),
            FamilySupport::V6 => write!(f, "v6"),
            FamilySupport::Both => write!(f, "both"),
        }
    }
}

/// Backend family enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Trie,        // MaxMind DB (GeoLite2, DB-IP)
    RangeIndex,  // IP2Location BIN
    CompactIndex, // ip2region xdb
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Trie => write!(f, "trie"),
            BackendKind::RangeIndex => write!(f, "range-index"),
            BackendKind::CompactIndex => write!(f, "compact-index"),
        }
    }
}

/// Names of one geographic entity keyed by locale tag
///
/// Only non-empty names are kept, so a present value always carries at least one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedNames(BTreeMap<String, String>);

impl LocalizedNames {
    /// Build from `(locale, name)` pairs, returning `None` when no name is non-empty
    pub fn from_pairs<I, K, V>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let names: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        if names.is_empty() { None } else { Some(Self(names)) }
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// First name found along a locale candidate chain
    pub fn preferred(&self, candidates: &[String]) -> Option<&str> {
        candidates.iter().find_map(|locale| self.get(locale))
    }
}

/// Merged record from the trie-hierarchical adapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrieRecord {
    pub country: Option<LocalizedNames>,
    pub region: Option<LocalizedNames>,
    pub city: Option<LocalizedNames>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: Option<String>,
    pub asn: Option<u32>,
    pub asn_org: Option<String>,
}

/// Record from the range-index adapter
///
/// `None` means the database type carries no such column; an empty string or
/// the `-` placeholder means the column exists but has no value for this range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeRecord {
    pub country_short: Option<String>,
    pub country_long: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub domain: Option<String>,
    pub zipcode: Option<String>,
}

/// Record from the compact-index adapter: the four ordered fields of the region string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactRecord {
    pub country: String,
    pub province: String,
    pub city: String,
    pub isp: String,
}

/// Backend-native record, one variant per database family
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Trie(TrieRecord),
    RangeIndex(RangeRecord),
    CompactIndex(CompactRecord),
}

/// Backend-agnostic result of one lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
}

impl NormalizedRecord {
    pub fn is_empty(&self) -> bool {
        *self == NormalizedRecord::default()
    }
}

/// Per-backend, per-IP failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("invalid address")]
    InvalidAddress,

    #[error("family unsupported by backend")]
    FamilyUnsupported,

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("{0}")]
    LookupFailed(String),
}

/// Outcome of asking one backend about one IP
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(NormalizedRecord),
    NotFound,
    Error(LookupError),
    Unavailable,
}

impl LookupOutcome {
    pub fn record(&self) -> Option<&NormalizedRecord> {
        match self {
            LookupOutcome::Found(record) => Some(record),
            _ => None,
        }
    }
}
