//! Merge of the city, ASN and country-only lookups into one trie record

use crate::database::{LocalizedNames, TrieRecord};
use crate::error::Result;

/// Owned view of a city-level lookup
#[derive(Debug, Clone, Default)]
pub struct CityHit {
    pub registered_country: Option<LocalizedNames>,
    pub country: Option<LocalizedNames>,
    pub first_subdivision: Option<LocalizedNames>,
    pub city: Option<LocalizedNames>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal_code: Option<String>,
}

/// Owned view of a country-only lookup
#[derive(Debug, Clone, Default)]
pub struct CountryHit {
    pub registered_country: Option<LocalizedNames>,
    pub country: Option<LocalizedNames>,
}

/// Owned view of an ASN lookup
#[derive(Debug, Clone, Default)]
pub struct AsnHit {
    pub number: Option<u32>,
    pub organization: Option<String>,
}

/// Per-backend merge settings
#[derive(Debug, Clone)]
pub struct MergePolicy {
    /// Prefer the registered country and let city fall back to region, then country
    pub granularity_fallback: bool,
    /// Locale candidate chain; a name set only counts when it has a name along it
    pub locales: Vec<String>,
}

impl MergePolicy {
    pub fn new(granularity_fallback: bool, locales: &[String]) -> Self {
        Self {
            granularity_fallback,
            locales: locales.to_vec(),
        }
    }

    fn present(&self, names: Option<LocalizedNames>) -> Option<LocalizedNames> {
        names.filter(|n| n.preferred(&self.locales).is_some())
    }
}

/// Merge per-file hits in a fixed precedence
///
/// Country prefers the registered country. City falls back to region, then country,
/// when `granularity_fallback` is set. ASN data always overlays. The country-only
/// file is consulted (through `country_file`) only while country is still missing,
/// and then also fills a missing city. Name sets with no name in `policy.locales`
/// are treated as missing.
///
/// Returns `Ok(None)` when no file had a record for the address.
pub fn merge<F>(
    primary: Option<CityHit>,
    asn: Option<AsnHit>,
    country_file: F,
    policy: &MergePolicy,
) -> Result<Option<TrieRecord>>
where
    F: FnOnce() -> Result<Option<CountryHit>>,
{
    let mut hit = false;
    let mut record = TrieRecord::default();

    if let Some(city) = primary {
        hit = true;
        let registered = policy.present(city.registered_country);
        let country = policy.present(city.country);
        record.country = if policy.granularity_fallback {
            registered.or(country)
        } else {
            country
        };
        record.region = policy.present(city.first_subdivision);
        record.city = policy.present(city.city);
        if policy.granularity_fallback {
            record.city = record
                .city
                .or_else(|| record.region.clone())
                .or_else(|| record.country.clone());
        }
        record.latitude = city.latitude;
        record.longitude = city.longitude;
        record.postal_code = city.postal_code.filter(|code| !code.is_empty());
    }

    if let Some(asn) = asn {
        hit = true;
        record.asn = asn.number;
        record.asn_org = asn.organization.filter(|org| !org.is_empty());
    }

    if record.country.is_none() {
        if let Some(country) = country_file()? {
            hit = true;
            let names = policy
                .present(country.registered_country)
                .or_else(|| policy.present(country.country));
            if record.city.is_none() {
                record.city = names.clone();
            }
            record.country = names;
        }
    }

    Ok(hit.then_some(record))
}
