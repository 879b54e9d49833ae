//! Trait definitions for the database module
//!
//! This module defines the common interface that all backend adapters must follow.

use crate::error::Result;
use std::net::IpAddr;

use super::types::{BackendKind, RawRecord};

/// Common trait for all backend adapters
///
/// An adapter wraps opened, read-only database files. Lookups take `&self` so one
/// adapter can serve concurrent queries without locking.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Look up the raw record for an address
    ///
    /// * `Ok(Some(record))` - a record was found
    /// * `Ok(None)` - the database was reached but holds no record for the address
    /// * `Err(GeoError)` - the lookup itself failed
    fn lookup(&self, ip: IpAddr) -> Result<Option<RawRecord>>;
}
