//! IP2Region database implementation
//!
//! ip2region answers with one `country|province|city|isp` string per lookup,
//! from separate xdb files for IPv4 and IPv6.

mod searcher;

pub use searcher::{CachePolicy, XdbHeader, XdbSearcher};

use crate::database::{AddressFamily, Backend, BackendKind, CompactRecord, RawRecord};
use crate::error::{GeoError, Result};
use std::net::IpAddr;
use std::path::Path;

/// Field separator in region strings
const REGION_SEPARATOR: char = '|';

/// IP2Region compact-index backend
pub struct IP2RegionDatabase {
    v4: Option<XdbSearcher>,
    v6: Option<XdbSearcher>,
}

impl IP2RegionDatabase {
    /// Open the configured per-family files
    ///
    /// Fails only when no file could be opened at all.
    pub fn open(v4: Option<&Path>, v6: Option<&Path>, policy: CachePolicy) -> Result<Self> {
        let v4 = v4.and_then(|path| open_logged(path, AddressFamily::V4, policy));
        let v6 = v6.and_then(|path| open_logged(path, AddressFamily::V6, policy));

        if v4.is_none() && v6.is_none() {
            return Err(GeoError::DatabaseNotFound(
                "no ip2region xdb file could be opened".to_string(),
            ));
        }

        Ok(Self { v4, v6 })
    }
}

fn open_logged(path: &Path, family: AddressFamily, policy: CachePolicy) -> Option<XdbSearcher> {
    log::info!("Loading ip2region {} database from: {:?} ({:?})", family, path, policy);
    let searcher = XdbSearcher::open(path, policy).and_then(|searcher| {
        if searcher.family() == family {
            Ok(searcher)
        } else {
            Err(GeoError::parse(format!(
                "file holds {} data, configured as {}",
                searcher.family(),
                family
            )))
        }
    });

    match searcher {
        Ok(searcher) => {
            log::info!(
                "Loaded ip2region xdb v{} from: {:?}",
                searcher.header().version,
                path
            );
            Some(searcher)
        }
        Err(e) => {
            log::warn!("Failed to open ip2region {} database {:?}: {}", family, path, e);
            None
        }
    }
}

/// Split a region string into its four ordered fields
///
/// Returns `None` for strings with fewer than four fields. Fields past the fourth
/// (newer releases append an ISO code) are ignored.
pub fn parse_region(region: &str) -> Option<CompactRecord> {
    let mut parts = region.split(REGION_SEPARATOR);
    let country = parts.next()?;
    let province = parts.next()?;
    let city = parts.next()?;
    let isp = parts.next()?;
    Some(CompactRecord {
        country: country.to_string(),
        province: province.to_string(),
        city: city.to_string(),
        isp: isp.to_string(),
    })
}

impl Backend for IP2RegionDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::CompactIndex
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<RawRecord>> {
        let family = AddressFamily::of(&ip);
        let searcher = match family {
            AddressFamily::V4 => self.v4.as_ref(),
            AddressFamily::V6 => self.v6.as_ref(),
        }
        .ok_or(GeoError::FamilyNotLoaded(family))?;

        let region = match searcher.search(ip)? {
            Some(region) if !region.is_empty() => region,
            _ => return Ok(None),
        };

        match parse_region(&region) {
            Some(record) => Ok(Some(RawRecord::CompactIndex(record))),
            None => {
                log::debug!("Malformed ip2region entry for {}: {:?}", ip, region);
                Ok(None)
            }
        }
    }
}
