//! Database module for ipgeo
//!
//! This module provides a unified interface over the supported offline IP
//! geolocation database families. Each family has an adapter implementing the
//! common [`Backend`] trait and returning its own [`RawRecord`] variant.
//!
//! # Module Organization
//!
//! - `types`: Common type definitions (records, outcomes, address families)
//! - `traits`: Trait definitions (Backend trait)
//! - `factory`: Opens the adapter matching a configured backend
//! - `registry`: Holds every configured backend and its opened handle
//! - `storage`: Memory-mapped or buffered file bytes for the binary decoders
//! - Backend implementations: maxmind, ip2location, ip2region

// Core modules
pub mod factory;
pub mod registry;
pub mod storage;
pub mod traits;
pub mod types;

// Backend implementation modules
pub mod ip2location;
pub mod ip2region;
pub mod maxmind;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export core types and traits for convenience
pub use factory::DatabaseFactory;
pub use registry::{BackendDescriptor, BackendRegistry};
pub use traits::Backend;
pub use types::{
    AddressFamily, BackendKind, CompactRecord, FamilySupport, LocalizedNames, LookupError,
    LookupOutcome, NormalizedRecord, RangeRecord, RawRecord, TrieRecord,
};

// Re-export backend implementations
pub use ip2location::IP2LocationDatabase;
pub use ip2region::IP2RegionDatabase;
pub use maxmind::MaxMindDatabase;
