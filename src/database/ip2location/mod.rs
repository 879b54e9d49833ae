//! IP2Location database implementation
//!
//! IP2Location ships separate BIN files for IPv4 and IPv6. Each file is opened
//! independently so a missing IPv6 file still leaves IPv4 lookups working.

mod reader;

pub use reader::{BinHeader, BinReader};

use crate::database::{AddressFamily, Backend, BackendKind, RawRecord};
use crate::error::{GeoError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

/// IP2Location range-index backend
pub struct IP2LocationDatabase {
    v4: Option<BinReader>,
    v6: Option<BinReader>,
}

impl IP2LocationDatabase {
    /// Open the configured per-family files
    ///
    /// Fails only when no file could be opened at all.
    pub fn open(v4: Option<&Path>, v6: Option<&Path>) -> Result<Self> {
        let v4 = v4.and_then(|path| open_logged(path, AddressFamily::V4));
        let v6 = v6.and_then(|path| open_logged(path, AddressFamily::V6));

        if v4.is_none() && v6.is_none() {
            return Err(GeoError::DatabaseNotFound(
                "no IP2Location BIN file could be opened".to_string(),
            ));
        }

        Ok(Self { v4, v6 })
    }

    fn reader(&self, family: AddressFamily) -> Option<&BinReader> {
        match family {
            AddressFamily::V4 => self.v4.as_ref(),
            AddressFamily::V6 => self.v6.as_ref(),
        }
    }

    fn loaded(&self, family: AddressFamily) -> Result<&BinReader> {
        self.reader(family).ok_or(GeoError::FamilyNotLoaded(family))
    }

    /// IPv4 rows for embedded addresses: the IPv6 file's own section, else the IPv4 file
    fn v4_rows(&self) -> Option<&BinReader> {
        self.v6
            .as_ref()
            .filter(|reader| reader.has_v4())
            .or_else(|| self.v4.as_ref().filter(|reader| reader.has_v4()))
    }
}

/// IPv4 address carried inside an IPv4-mapped, 6to4 or Teredo IPv6 address
///
/// IP2Location only ranks these forms under their IPv4 rows.
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    let value = u128::from(ip);
    if let Some(v4) = ip.to_ipv4_mapped() {
        Some(v4)
    } else if value >> 112 == 0x2002 {
        Some(Ipv4Addr::from((value >> 80) as u32))
    } else if value >> 96 == 0x2001_0000 {
        // Teredo stores the client address bit-inverted in the low 32 bits
        Some(Ipv4Addr::from(!(value as u32)))
    } else {
        None
    }
}

fn open_logged(path: &Path, family: AddressFamily) -> Option<BinReader> {
    log::info!("Loading IP2Location {} database from: {:?}", family, path);
    match BinReader::open(path) {
        Ok(reader) => {
            let header = reader.header();
            log::info!(
                "Loaded IP2Location DB{} (20{:02}-{:02}-{:02}) from: {:?}",
                header.db_type,
                header.year,
                header.month,
                header.day,
                path
            );
            Some(reader)
        }
        Err(e) => {
            log::warn!("Failed to open IP2Location {} database {:?}: {}", family, path, e);
            None
        }
    }
}

impl Backend for IP2LocationDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::RangeIndex
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<RawRecord>> {
        let record = match ip {
            IpAddr::V4(v4) => self.loaded(AddressFamily::V4)?.lookup_v4(v4)?,
            IpAddr::V6(v6) => match embedded_v4(v6).zip(self.v4_rows()) {
                Some((v4, reader)) => reader.lookup_v4(v4)?,
                None => self.loaded(AddressFamily::V6)?.lookup_v6(v6)?,
            },
        };
        Ok(record.map(RawRecord::RangeIndex))
    }
}
