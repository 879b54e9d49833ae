//! Field normalization
//!
//! Maps each backend family's raw record onto [`NormalizedRecord`]. Placeholder
//! values (`-` in IP2Location, `0` in ip2region) and empty strings never become
//! fields.

use crate::database::{
    CompactRecord, LocalizedNames, NormalizedRecord, RangeRecord, RawRecord, TrieRecord,
};
use crate::error::{GeoError, Result};
use unic_langid::LanguageIdentifier;

/// Locale used when none of the preferred locales has a name
const DEFAULT_LOCALE: &str = "en";

/// Placeholder for an unknown IP2Location field
const RANGE_INDEX_PLACEHOLDER: &str = "-";

/// Placeholder for an unknown ip2region field
const COMPACT_INDEX_PLACEHOLDER: &str = "0";

#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    /// Name lookup order, most preferred first
    candidates: Vec<String>,
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self {
            candidates: vec!["zh-CN".to_string(), "zh".to_string(), DEFAULT_LOCALE.to_string()],
        }
    }
}

impl FieldNormalizer {
    /// Build from preferred locale tags such as `zh-CN` or `de`
    ///
    /// Each tag is tried as written (canonicalized) and then by its bare language.
    pub fn new<S: AsRef<str>>(locales: &[S]) -> Result<Self> {
        let mut candidates: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        };

        for tag in locales {
            let langid: LanguageIdentifier = tag
                .as_ref()
                .parse()
                .map_err(|e| GeoError::config(format!("Invalid locale {:?}: {}", tag.as_ref(), e)))?;
            push(langid.to_string());
            push(langid.language.as_str().to_string());
        }
        push(DEFAULT_LOCALE.to_string());

        Ok(Self { candidates })
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Preferred rendering of a localized name
    pub fn localize(&self, names: Option<&LocalizedNames>) -> Option<String> {
        names?.preferred(&self.candidates).map(str::to_string)
    }

    pub fn normalize(&self, raw: RawRecord) -> NormalizedRecord {
        match raw {
            RawRecord::Trie(record) => self.normalize_trie(record),
            RawRecord::RangeIndex(record) => normalize_range(record),
            RawRecord::CompactIndex(record) => normalize_compact(record),
        }
    }

    fn normalize_trie(&self, record: TrieRecord) -> NormalizedRecord {
        NormalizedRecord {
            country: self.localize(record.country.as_ref()),
            region: self.localize(record.region.as_ref()),
            city: self.localize(record.city.as_ref()),
            latitude: record.latitude,
            longitude: record.longitude,
            asn: record.asn,
            isp: record.asn_org.and_then(non_empty),
            domain: None,
            zipcode: record.postal_code.and_then(non_empty),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn without_placeholder(value: String, placeholder: &str) -> Option<String> {
    non_empty(value).filter(|v| v != placeholder)
}

fn normalize_range(record: RangeRecord) -> NormalizedRecord {
    let clean = |value: Option<String>| value.and_then(|v| without_placeholder(v, RANGE_INDEX_PLACEHOLDER));
    NormalizedRecord {
        country: clean(record.country_long),
        region: clean(record.region),
        city: clean(record.city),
        isp: clean(record.isp),
        domain: clean(record.domain),
        zipcode: clean(record.zipcode),
        ..Default::default()
    }
}

fn normalize_compact(record: CompactRecord) -> NormalizedRecord {
    let clean = |value: String| without_placeholder(value, COMPACT_INDEX_PLACEHOLDER);
    NormalizedRecord {
        country: clean(record.country),
        region: clean(record.province),
        city: clean(record.city),
        isp: clean(record.isp),
        ..Default::default()
    }
}
