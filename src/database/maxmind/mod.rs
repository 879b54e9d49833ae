//! MaxMind DB database implementation
//!
//! This module implements the trie-hierarchical backend on top of the `maxminddb`
//! reader. One logical backend may combine up to three files: a city-level file,
//! a country-only fallback file and an ASN file (the GeoLite2 layout). DB-IP
//! ships a single city-level file in the same format.

mod merge;

pub use merge::{AsnHit, CityHit, CountryHit, MergePolicy, merge};

use crate::database::{Backend, BackendKind, LocalizedNames, RawRecord};
use crate::error::Result;
use maxminddb::{MaxMindDBError, Reader, geoip2};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

/// MaxMind DB trie-hierarchical backend
pub struct MaxMindDatabase {
    city: Reader<Vec<u8>>,
    country: Option<Reader<Vec<u8>>>,
    asn: Option<Reader<Vec<u8>>>,
    policy: MergePolicy,
}

impl MaxMindDatabase {
    /// Open the city file, plus optional country and ASN files
    ///
    /// The city file is required. Optional files that fail to open are logged and skipped.
    pub fn open(
        city: &Path,
        country: Option<&Path>,
        asn: Option<&Path>,
        policy: MergePolicy,
    ) -> Result<Self> {
        log::info!("Loading MaxMind DB from: {:?}", city);
        let city_reader = Reader::open_readfile(city)?;
        log::info!(
            "Successfully loaded {} from: {:?}",
            city_reader.metadata.database_type,
            city
        );

        Ok(Self {
            city: city_reader,
            country: country.and_then(open_optional),
            asn: asn.and_then(open_optional),
            policy,
        })
    }
}

fn open_optional(path: &Path) -> Option<Reader<Vec<u8>>> {
    match Reader::open_readfile(path) {
        Ok(reader) => {
            log::info!(
                "Successfully loaded {} from: {:?}",
                reader.metadata.database_type,
                path
            );
            Some(reader)
        }
        Err(e) => {
            log::warn!("Failed to open MaxMind DB {:?}: {}", path, e);
            None
        }
    }
}

/// Lookup mapping "address not found" to `None`
fn lookup_opt<'de, T>(reader: &'de Reader<Vec<u8>>, ip: IpAddr) -> Result<Option<T>>
where
    T: serde::Deserialize<'de>,
{
    match reader.lookup::<T>(ip) {
        Ok(value) => Ok(Some(value)),
        Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn names(names: Option<&BTreeMap<&str, &str>>) -> Option<LocalizedNames> {
    names.and_then(|n| LocalizedNames::from_pairs(n.iter().map(|(k, v)| (*k, *v))))
}

fn country_names(country: Option<&geoip2::country::Country>) -> Option<LocalizedNames> {
    country.and_then(|c| names(c.names.as_ref()))
}

fn city_hit(city: geoip2::City) -> CityHit {
    CityHit {
        registered_country: country_names(city.registered_country.as_ref()),
        country: country_names(city.country.as_ref()),
        first_subdivision: city
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|sub| names(sub.names.as_ref())),
        city: city.city.as_ref().and_then(|c| names(c.names.as_ref())),
        latitude: city.location.as_ref().and_then(|l| l.latitude),
        longitude: city.location.as_ref().and_then(|l| l.longitude),
        postal_code: city.postal.and_then(|p| p.code).map(str::to_string),
    }
}

fn country_hit(country: geoip2::Country) -> CountryHit {
    CountryHit {
        registered_country: country_names(country.registered_country.as_ref()),
        country: country_names(country.country.as_ref()),
    }
}

fn asn_hit(asn: geoip2::Asn) -> AsnHit {
    AsnHit {
        number: asn.autonomous_system_number,
        organization: asn.autonomous_system_organization.map(str::to_string),
    }
}

impl Backend for MaxMindDatabase {
    fn kind(&self) -> BackendKind {
        BackendKind::Trie
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<RawRecord>> {
        let primary = lookup_opt::<geoip2::City>(&self.city, ip)?.map(city_hit);

        let asn = match &self.asn {
            Some(reader) => lookup_opt::<geoip2::Asn>(reader, ip)?.map(asn_hit),
            None => None,
        };

        let country_file = || -> Result<Option<CountryHit>> {
            match &self.country {
                Some(reader) => Ok(lookup_opt::<geoip2::Country>(reader, ip)?.map(country_hit)),
                None => Ok(None),
            }
        };

        let record = merge(primary, asn, country_file, &self.policy)?;
        Ok(record.map(RawRecord::Trie))
    }
}
