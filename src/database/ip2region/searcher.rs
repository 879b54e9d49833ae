//! ip2region xdb searcher
//!
//! ```text
//! +----------------+------------------------+-------------+-----------------+
//! | header (256 B) | vector index (512 KiB) | region data | segment index   |
//! +----------------+------------------------+-------------+-----------------+
//! ```
//!
//! The vector index is a 256x256 table keyed by the first two address bytes; each
//! entry holds the first and last segment pointer for that prefix. A segment is
//! `start_ip, end_ip, data_len (u16), data_ptr (u32)`. IPv4 bounds are little-endian
//! u32, IPv6 bounds are 16 big-endian bytes.

use crate::database::AddressFamily;
use crate::database::storage::Storage;
use crate::error::{GeoError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

const HEADER_LEN: usize = 256;
const VECTOR_INDEX_COLS: usize = 256;
const VECTOR_INDEX_ENTRY_LEN: usize = 8;
const VECTOR_INDEX_LEN: usize = 256 * VECTOR_INDEX_COLS * VECTOR_INDEX_ENTRY_LEN;

/// How much of an xdb file is held in memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Memory-map the file and let the OS page it in
    #[default]
    File,
    /// Memory-map the file and copy the vector index into memory
    VectorIndex,
    /// Read the whole file into memory
    Content,
}

/// Parsed xdb header
#[derive(Debug, Clone)]
pub struct XdbHeader {
    pub version: u16,
    pub index_policy: u16,
    pub created_at: u32,
    pub start_index_ptr: u32,
    pub end_index_ptr: u32,
    pub family: AddressFamily,
}

impl XdbHeader {
    fn parse(data: &Storage) -> Result<Self> {
        if data.len() < HEADER_LEN + VECTOR_INDEX_LEN {
            return Err(GeoError::corrupted(format!(
                "xdb file too small: {} bytes",
                data.len()
            )));
        }

        let version = data.read_u16_le(0)?;
        // Version 2 files predate the ip version field and are IPv4 only
        let family = match (version, data.read_u16_le(16)?) {
            (2, _) | (_, 4) => AddressFamily::V4,
            (_, 6) => AddressFamily::V6,
            (v, ip_version) => {
                return Err(GeoError::parse(format!(
                    "Unsupported xdb version {} / ip version {}",
                    v, ip_version
                )));
            }
        };

        Ok(Self {
            version,
            index_policy: data.read_u16_le(2)?,
            created_at: data.read_u32_le(4)?,
            start_index_ptr: data.read_u32_le(8)?,
            end_index_ptr: data.read_u32_le(12)?,
            family,
        })
    }

    fn ip_len(&self) -> usize {
        match self.family {
            AddressFamily::V4 => 4,
            AddressFamily::V6 => 16,
        }
    }

    fn segment_len(&self) -> usize {
        self.ip_len() * 2 + 6
    }
}

/// Searcher over one xdb file
pub struct XdbSearcher {
    data: Storage,
    vector_index: Option<Box<[u8]>>,
    header: XdbHeader,
}

impl XdbSearcher {
    pub fn open(path: &Path, policy: CachePolicy) -> Result<Self> {
        let data = match policy {
            CachePolicy::Content => Storage::read(path)?,
            CachePolicy::File | CachePolicy::VectorIndex => Storage::map(path)?,
        };
        Self::from_storage(data, policy)
    }

    pub fn from_storage(data: Storage, policy: CachePolicy) -> Result<Self> {
        let header = XdbHeader::parse(&data)?;
        let vector_index = match policy {
            CachePolicy::VectorIndex => Some(data.slice(HEADER_LEN, VECTOR_INDEX_LEN)?.into()),
            _ => None,
        };
        Ok(Self {
            data,
            vector_index,
            header,
        })
    }

    pub fn header(&self) -> &XdbHeader {
        &self.header
    }

    pub fn family(&self) -> AddressFamily {
        self.header.family
    }

    /// Segment pointer range for the first two address bytes
    fn vector_entry(&self, b0: u8, b1: u8) -> Result<(usize, usize)> {
        let offset = (b0 as usize * VECTOR_INDEX_COLS + b1 as usize) * VECTOR_INDEX_ENTRY_LEN;
        let entry = match &self.vector_index {
            Some(index) => index
                .get(offset..offset + VECTOR_INDEX_ENTRY_LEN)
                .ok_or(GeoError::IndexOutOfBounds(offset, index.len()))?,
            None => self.data.slice(HEADER_LEN + offset, VECTOR_INDEX_ENTRY_LEN)?,
        };
        let start = u32::from_le_bytes(entry[0..4].try_into()?) as usize;
        let end = u32::from_le_bytes(entry[4..8].try_into()?) as usize;
        Ok((start, end))
    }

    /// Search the region string for an address
    pub fn search(&self, ip: IpAddr) -> Result<Option<String>> {
        let family = AddressFamily::of(&ip);
        if family != self.header.family {
            return Err(GeoError::parse(format!(
                "{} address searched in {} xdb file",
                family, self.header.family
            )));
        }

        let key: Vec<u8> = match ip {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };

        let (start_ptr, end_ptr) = self.vector_entry(key[0], key[1])?;
        if start_ptr == 0 || end_ptr < start_ptr {
            return Ok(None);
        }

        let ip_len = self.header.ip_len();
        let segment_len = self.header.segment_len();
        let mut low = 0usize;
        let mut high = (end_ptr - start_ptr) / segment_len;

        while low <= high {
            let mid = low + (high - low) / 2;
            let segment = self.data.slice(start_ptr + mid * segment_len, segment_len)?;
            let (start_ip, end_ip) = segment.split_at(ip_len);

            if compare(&key, start_ip) == std::cmp::Ordering::Less {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else if compare(&key, &end_ip[..ip_len]) == std::cmp::Ordering::Greater {
                low = mid + 1;
            } else {
                let data_len = u16::from_le_bytes(segment[ip_len * 2..ip_len * 2 + 2].try_into()?) as usize;
                let data_ptr = u32::from_le_bytes(segment[ip_len * 2 + 2..ip_len * 2 + 6].try_into()?) as usize;
                let region = self.data.slice(data_ptr, data_len)?;
                return Ok(Some(String::from_utf8_lossy(region).into_owned()));
            }
        }

        Ok(None)
    }
}

/// Compare a big-endian address key with a stored segment bound
fn compare(key: &[u8], stored: &[u8]) -> std::cmp::Ordering {
    if key.len() == 4 {
        // IPv4 bounds are stored little-endian
        let stored = [stored[3], stored[2], stored[1], stored[0]];
        key.cmp(&stored[..])
    } else {
        key.cmp(stored)
    }
}
