//! IP2Location BIN decoder
//!
//! File layout (all integers little-endian, base addresses 1-based):
//!
//! ```text
//! [0]      database type (selects which columns exist)
//! [1]      column count, including ip_from
//! [2..5]   year, month, day
//! [5..9]   IPv4 row count     [9..13]  IPv4 rows base address
//! [13..17] IPv6 row count     [17..21] IPv6 rows base address
//! [21..25] IPv4 index base    [25..29] IPv6 index base (0 = no index)
//! [29]     product code
//! ```
//!
//! Each row starts with `ip_from` (4 bytes for IPv4, 16 for IPv6) followed by one
//! u32 per remaining column. String columns hold a pointer to a length-prefixed
//! string. A row covers `[ip_from, next_row.ip_from)`.

use crate::database::storage::Storage;
use crate::database::types::RangeRecord;
use crate::error::{GeoError, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

const HEADER_LEN: usize = 64;
const INDEX_ENTRY_LEN: usize = 8;

/// Column positions per database type (1-based, 0 = not present)
const COUNTRY_POSITION: [u8; 27] = [0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];
const REGION_POSITION: [u8; 27] = [0, 0, 0, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3];
const CITY_POSITION: [u8; 27] = [0, 0, 0, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4];
const ISP_POSITION: [u8; 27] = [0, 0, 3, 0, 5, 0, 7, 5, 7, 0, 8, 0, 9, 0, 9, 0, 9, 0, 9, 7, 9, 0, 9, 7, 9, 9, 9];
const DOMAIN_POSITION: [u8; 27] = [0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 9, 0, 10, 0, 10, 0, 10, 0, 10, 8, 10, 0, 10, 8, 10, 10, 10];
const ZIPCODE_POSITION: [u8; 27] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 7, 7, 7, 0, 7, 7, 7, 0, 7, 0, 7, 7, 7, 0, 7, 7, 7];

/// Offset from a country pointer to the long country name (after the 2-letter code)
const COUNTRY_LONG_OFFSET: usize = 3;

/// Parsed BIN header
#[derive(Debug, Clone)]
pub struct BinHeader {
    pub db_type: u8,
    pub db_column: u8,
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub v4: Section,
    pub v6: Section,
}

/// Row table of one address family
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub count: u32,
    /// 0-based offset of the first row
    base: usize,
    /// 0-based offset of the first-16-bit index, if the file carries one
    index: Option<usize>,
    ip_len: usize,
}

impl Section {
    fn bits(&self) -> u32 {
        (self.ip_len * 8) as u32
    }
}

impl BinHeader {
    fn parse(data: &Storage) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(GeoError::corrupted(format!(
                "IP2Location file too small: {} bytes",
                data.len()
            )));
        }

        let db_type = data.read_u8(0)?;
        let db_column = data.read_u8(1)?;
        let year = data.read_u8(2)?;
        let product_code = data.read_u8(29)?;

        if db_type == 0 || db_type as usize >= COUNTRY_POSITION.len() {
            return Err(GeoError::parse(format!("Unsupported IP2Location database type: {}", db_type)));
        }
        if db_column < 2 {
            return Err(GeoError::corrupted(format!("Invalid IP2Location column count: {}", db_column)));
        }
        // Releases from 2021 on stamp product code 1 for IP2Location BIN files
        if year >= 21 && product_code != 1 {
            return Err(GeoError::parse("Incorrect IP2Location BIN file format"));
        }

        let section = |count_at: usize, base_at: usize, index_at: usize, ip_len: usize| -> Result<Section> {
            let base = data.read_u32_le(base_at)? as usize;
            let index = data.read_u32_le(index_at)? as usize;
            Ok(Section {
                count: data.read_u32_le(count_at)?,
                base: base.saturating_sub(1),
                index: if index == 0 { None } else { Some(index - 1) },
                ip_len,
            })
        };

        Ok(Self {
            db_type,
            db_column,
            year,
            month: data.read_u8(3)?,
            day: data.read_u8(4)?,
            v4: section(5, 9, 21, 4)?,
            v6: section(13, 17, 25, 16)?,
        })
    }
}

/// Reader for one IP2Location BIN file
pub struct BinReader {
    data: Storage,
    header: BinHeader,
}

impl BinReader {
    /// Memory-map and validate a BIN file
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_storage(Storage::map(path)?)
    }

    pub fn from_storage(data: Storage) -> Result<Self> {
        let header = BinHeader::parse(&data)?;
        Ok(Self { data, header })
    }

    pub fn header(&self) -> &BinHeader {
        &self.header
    }

    pub fn has_v4(&self) -> bool {
        self.header.v4.count > 0
    }

    pub fn has_v6(&self) -> bool {
        self.header.v6.count > 0
    }

    pub fn lookup_v4(&self, ip: Ipv4Addr) -> Result<Option<RangeRecord>> {
        self.lookup(self.header.v4, u32::from(ip) as u128)
    }

    pub fn lookup_v6(&self, ip: Ipv6Addr) -> Result<Option<RangeRecord>> {
        self.lookup(self.header.v6, u128::from(ip))
    }

    fn lookup(&self, section: Section, ip: u128) -> Result<Option<RangeRecord>> {
        match self.search(section, ip)? {
            Some(row) => self.read_record(section, row).map(Some),
            None => Ok(None),
        }
    }

    fn row_len(&self, section: Section) -> usize {
        section.ip_len + (self.header.db_column as usize - 1) * 4
    }

    fn row_offset(&self, section: Section, row: u32) -> usize {
        section.base + row as usize * self.row_len(section)
    }

    fn read_ip_from(&self, section: Section, row: u32) -> Result<u128> {
        let offset = self.row_offset(section, row);
        if section.ip_len == 4 {
            Ok(self.data.read_u32_le(offset)? as u128)
        } else {
            Ok(u128::from_le_bytes(self.data.slice(offset, 16)?.try_into()?))
        }
    }

    /// Binary search for the row whose range contains `ip`
    fn search(&self, section: Section, ip: u128) -> Result<Option<u32>> {
        if section.count == 0 {
            return Ok(None);
        }

        let max = if section.ip_len == 4 { u32::MAX as u128 } else { u128::MAX };
        let ip = if ip >= max { max - 1 } else { ip };

        let (mut low, mut high) = match section.index {
            Some(index) => {
                let key = (ip >> (section.bits() - 16)) as usize;
                let pos = index + key * INDEX_ENTRY_LEN;
                (self.data.read_u32_le(pos)?, self.data.read_u32_le(pos + 4)?)
            }
            None => (0, section.count),
        };
        high = high.min(section.count - 1);

        while low <= high {
            let mid = low + (high - low) / 2;
            let ip_from = self.read_ip_from(section, mid)?;
            let ip_to = self.read_ip_from(section, mid + 1)?;

            if ip >= ip_from && ip < ip_to {
                return Ok(Some(mid));
            } else if ip < ip_from {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else {
                low = mid + 1;
            }
        }

        Ok(None)
    }

    /// Offset of a column value within a row, or `None` if the type lacks the column
    fn column_offset(&self, section: Section, row: u32, positions: &[u8; 27]) -> Option<usize> {
        let position = positions[self.header.db_type as usize] as usize;
        if position < 2 || position > self.header.db_column as usize {
            return None;
        }
        Some(self.row_offset(section, row) + section.ip_len + (position - 2) * 4)
    }

    fn read_column(&self, section: Section, row: u32, positions: &[u8; 27]) -> Result<Option<String>> {
        match self.column_offset(section, row, positions) {
            Some(offset) => {
                let pointer = self.data.read_u32_le(offset)? as usize;
                self.read_string(pointer).map(Some)
            }
            None => Ok(None),
        }
    }

    fn read_string(&self, pointer: usize) -> Result<String> {
        let len = self.data.read_u8(pointer)? as usize;
        let bytes = self.data.slice(pointer + 1, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_record(&self, section: Section, row: u32) -> Result<RangeRecord> {
        let (country_short, country_long) = match self.column_offset(section, row, &COUNTRY_POSITION) {
            Some(offset) => {
                let pointer = self.data.read_u32_le(offset)? as usize;
                (
                    Some(self.read_string(pointer)?),
                    Some(self.read_string(pointer + COUNTRY_LONG_OFFSET)?),
                )
            }
            None => (None, None),
        };

        Ok(RangeRecord {
            country_short,
            country_long,
            region: self.read_column(section, row, &REGION_POSITION)?,
            city: self.read_column(section, row, &CITY_POSITION)?,
            isp: self.read_column(section, row, &ISP_POSITION)?,
            domain: self.read_column(section, row, &DOMAIN_POSITION)?,
            zipcode: self.read_column(section, row, &ZIPCODE_POSITION)?,
        })
    }
}
