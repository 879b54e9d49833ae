//! Builders for small but valid database files used by unit tests

use crate::database::{Backend, BackendKind, RawRecord};
use crate::error::{GeoError, Result};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

fn ip_value(ip: &str) -> (u128, usize) {
    match ip.parse::<IpAddr>().expect("fixture IP") {
        IpAddr::V4(v4) => (u32::from(v4) as u128, 4),
        IpAddr::V6(v6) => (u128::from(v6), 16),
    }
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write fixture");
    file.flush().expect("flush fixture");
    file
}

/// One IP2Location row (database type 10 column set)
pub struct BinRow {
    from: u128,
    country_short: String,
    country_long: String,
    region: String,
    city: String,
    isp: String,
    domain: String,
    zipcode: String,
}

impl BinRow {
    #[allow(clippy::too_many_arguments)]
    fn new(
        from: &str,
        country_short: &str,
        country_long: &str,
        region: &str,
        city: &str,
        isp: &str,
        domain: &str,
        zipcode: &str,
    ) -> Self {
        Self {
            from: ip_value(from).0,
            country_short: country_short.to_string(),
            country_long: country_long.to_string(),
            region: region.to_string(),
            city: city.to_string(),
            isp: isp.to_string(),
            domain: domain.to_string(),
            zipcode: zipcode.to_string(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v4(
        from: &str,
        country_short: &str,
        country_long: &str,
        region: &str,
        city: &str,
        isp: &str,
        domain: &str,
        zipcode: &str,
    ) -> Self {
        Self::new(from, country_short, country_long, region, city, isp, domain, zipcode)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn v6(
        from: &str,
        country_short: &str,
        country_long: &str,
        region: &str,
        city: &str,
        isp: &str,
        domain: &str,
        zipcode: &str,
    ) -> Self {
        Self::new(from, country_short, country_long, region, city, isp, domain, zipcode)
    }
}

/// IP2Location DB10 file: country, region, city, latitude, longitude, zipcode, isp, domain
pub struct BinFixture {
    v4: Vec<BinRow>,
    v6: Vec<BinRow>,
    v4_index: bool,
}

const BIN_DB_TYPE: u8 = 10;
const BIN_COLUMNS: u8 = 9;
const BIN_HEADER_LEN: usize = 64;
const BIN_INDEX_LEN: usize = 65536 * 8;

fn bin_row_len(ip_len: usize) -> usize {
    ip_len + (BIN_COLUMNS as usize - 1) * 4
}

/// Bytes taken by a row table, terminal row included
fn bin_table_len(rows: &[BinRow], ip_len: usize) -> usize {
    if rows.is_empty() { 0 } else { (rows.len() + 1) * bin_row_len(ip_len) }
}

impl BinFixture {
    /// IPv4 rows, written with a first-16-bit index
    pub fn v4(rows: Vec<BinRow>) -> Self {
        Self { v4: rows, v6: Vec::new(), v4_index: true }
    }

    /// IPv6 rows, written without an index
    pub fn v6(rows: Vec<BinRow>) -> Self {
        Self { v4: Vec::new(), v6: rows, v4_index: false }
    }

    /// Both tables in one file, the way the IPv6 product ships
    pub fn dual(v4: Vec<BinRow>, v6: Vec<BinRow>) -> Self {
        Self { v4, v6, v4_index: true }
    }

    pub fn write(&self) -> NamedTempFile {
        write_temp(&self.build())
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write fixture");
    }

    pub fn build(&self) -> Vec<u8> {
        let with_index = self.v4_index && !self.v4.is_empty();
        let index_at = BIN_HEADER_LEN;
        let v4_at = if with_index { index_at + BIN_INDEX_LEN } else { BIN_HEADER_LEN };
        let v6_at = v4_at + bin_table_len(&self.v4, 4);
        let strings_at = v6_at + bin_table_len(&self.v6, 16);

        let mut strings = Vec::new();
        let mut tables = Vec::new();
        encode_bin_rows(&self.v4, 4, strings_at, &mut tables, &mut strings);
        encode_bin_rows(&self.v6, 16, strings_at, &mut tables, &mut strings);

        let mut index = Vec::new();
        if with_index {
            let row_of = |ip: u128| -> u32 {
                self.v4.iter().rposition(|r| r.from <= ip).unwrap_or(0) as u32
            };
            for key in 0u128..65536 {
                let block_start = key << 16;
                let block_end = block_start + 0xffff;
                index.extend_from_slice(&row_of(block_start).to_le_bytes());
                index.extend_from_slice(&row_of(block_end).to_le_bytes());
            }
        }

        let mut header = vec![0u8; BIN_HEADER_LEN];
        header[0] = BIN_DB_TYPE;
        header[1] = BIN_COLUMNS;
        header[2] = 24;
        header[3] = 12;
        header[4] = 1;
        header[5..9].copy_from_slice(&(self.v4.len() as u32).to_le_bytes());
        header[9..13].copy_from_slice(&((v4_at + 1) as u32).to_le_bytes());
        header[13..17].copy_from_slice(&(self.v6.len() as u32).to_le_bytes());
        header[17..21].copy_from_slice(&((v6_at + 1) as u32).to_le_bytes());
        let index_base: u32 = if with_index { (index_at + 1) as u32 } else { 0 };
        header[21..25].copy_from_slice(&index_base.to_le_bytes());
        header[29] = 1;

        let mut bytes = header;
        bytes.extend_from_slice(&index);
        bytes.extend_from_slice(&tables);
        bytes.extend_from_slice(&strings);
        bytes
    }
}

/// Append one row table plus its terminal row; strings go to the shared pool at `strings_at`
fn encode_bin_rows(
    rows: &[BinRow],
    ip_len: usize,
    strings_at: usize,
    table: &mut Vec<u8>,
    strings: &mut Vec<u8>,
) {
    if rows.is_empty() {
        return;
    }

    let push_string = |strings: &mut Vec<u8>, s: &str| -> u32 {
        let pointer = (strings_at + strings.len()) as u32;
        strings.push(s.len() as u8);
        strings.extend_from_slice(s.as_bytes());
        pointer
    };
    let write_ip = |table: &mut Vec<u8>, ip: u128| {
        if ip_len == 4 {
            table.extend_from_slice(&(ip as u32).to_le_bytes());
        } else {
            table.extend_from_slice(&ip.to_le_bytes());
        }
    };

    for row in rows {
        write_ip(table, row.from);

        // Country: 2-byte short code slot, long name right after it
        let country = (strings_at + strings.len()) as u32;
        strings.push(row.country_short.len() as u8);
        let mut short = row.country_short.as_bytes().to_vec();
        short.resize(2, 0);
        strings.extend_from_slice(&short);
        strings.push(row.country_long.len() as u8);
        strings.extend_from_slice(row.country_long.as_bytes());

        let region = push_string(strings, &row.region);
        let city = push_string(strings, &row.city);
        let zipcode = push_string(strings, &row.zipcode);
        let isp = push_string(strings, &row.isp);
        let domain = push_string(strings, &row.domain);

        for value in [
            country,
            region,
            city,
            0f32.to_bits(),
            0f32.to_bits(),
            zipcode,
            isp,
            domain,
        ] {
            table.extend_from_slice(&value.to_le_bytes());
        }
    }

    // Terminal row closing the last range
    let max = if ip_len == 4 { u32::MAX as u128 } else { u128::MAX };
    write_ip(table, max);
    table.extend(std::iter::repeat(0u8).take(bin_row_len(ip_len) - ip_len));
}

/// ip2region xdb file with version 3 layout
pub struct XdbFixture {
    segments: Vec<(u128, u128, String)>,
    ip_len: usize,
}

const XDB_HEADER_LEN: usize = 256;
const XDB_VECTOR_LEN: usize = 256 * 256 * 8;

impl XdbFixture {
    /// Segments as `(start, end, region)`, sorted and non-overlapping
    pub fn new(segments: &[(&str, &str, &str)]) -> Self {
        let mut ip_len = 4;
        let segments = segments
            .iter()
            .map(|(start, end, region)| {
                let (start, len) = ip_value(start);
                ip_len = len;
                (start, ip_value(end).0, region.to_string())
            })
            .collect();
        Self { segments, ip_len }
    }

    pub fn write(&self) -> NamedTempFile {
        write_temp(&self.build())
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write fixture");
    }

    pub fn build(&self) -> Vec<u8> {
        let bits = (self.ip_len * 8) as u32;
        let segment_len = self.ip_len * 2 + 6;
        let data_at = XDB_HEADER_LEN + XDB_VECTOR_LEN;

        let mut data = Vec::new();
        let mut regions = Vec::new();
        for (_, _, region) in &self.segments {
            regions.push(((data_at + data.len()) as u32, region.len() as u16));
            data.extend_from_slice(region.as_bytes());
        }

        let segments_at = data_at + data.len();
        let mut segments = Vec::new();
        let mut vector = vec![0u8; XDB_VECTOR_LEN];
        for (i, ((start, end, _), (ptr, len))) in self.segments.iter().zip(&regions).enumerate() {
            if self.ip_len == 4 {
                segments.extend_from_slice(&(*start as u32).to_le_bytes());
                segments.extend_from_slice(&(*end as u32).to_le_bytes());
            } else {
                segments.extend_from_slice(&start.to_be_bytes());
                segments.extend_from_slice(&end.to_be_bytes());
            }
            segments.extend_from_slice(&len.to_le_bytes());
            segments.extend_from_slice(&ptr.to_le_bytes());

            let segment_ptr = (segments_at + i * segment_len) as u32;
            let shift = bits - 16;
            for key in (*start >> shift) as usize..=(*end >> shift) as usize {
                let at = key * 8;
                if vector[at..at + 4] == [0, 0, 0, 0] {
                    vector[at..at + 4].copy_from_slice(&segment_ptr.to_le_bytes());
                }
                vector[at + 4..at + 8].copy_from_slice(&segment_ptr.to_le_bytes());
            }
        }

        let mut header = vec![0u8; XDB_HEADER_LEN];
        header[0..2].copy_from_slice(&3u16.to_le_bytes());
        header[2..4].copy_from_slice(&1u16.to_le_bytes());
        header[4..8].copy_from_slice(&1_735_689_600u32.to_le_bytes());
        header[8..12].copy_from_slice(&(segments_at as u32).to_le_bytes());
        let last = segments_at + self.segments.len().saturating_sub(1) * segment_len;
        header[12..16].copy_from_slice(&(last as u32).to_le_bytes());
        let ip_version: u16 = if self.ip_len == 4 { 4 } else { 6 };
        header[16..18].copy_from_slice(&ip_version.to_le_bytes());
        header[18..20].copy_from_slice(&4u16.to_le_bytes());

        let mut bytes = header;
        bytes.extend_from_slice(&vector);
        bytes.extend_from_slice(&data);
        bytes.extend_from_slice(&segments);
        bytes
    }
}

/// Value in a MaxMind DB data section
#[derive(Debug, Clone)]
pub enum MmdbValue {
    Str(String),
    Double(f64),
    U16(u16),
    U32(u32),
    U64(u64),
    Map(Vec<(String, MmdbValue)>),
    Array(Vec<MmdbValue>),
}

impl MmdbValue {
    pub fn str(value: &str) -> Self {
        MmdbValue::Str(value.to_string())
    }

    pub fn map<const N: usize>(pairs: [(&str, MmdbValue); N]) -> Self {
        MmdbValue::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// `{"names": {locale: name, ...}}`
    pub fn named(names: &[(&str, &str)]) -> Self {
        let names = names.iter().map(|(k, v)| (k.to_string(), MmdbValue::str(v))).collect();
        MmdbValue::map([("names", MmdbValue::Map(names))])
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            MmdbValue::Str(s) => {
                mmdb_control(out, 2, s.len());
                out.extend_from_slice(s.as_bytes());
            }
            MmdbValue::Double(v) => {
                mmdb_control(out, 3, 8);
                out.extend_from_slice(&v.to_be_bytes());
            }
            MmdbValue::U16(v) => {
                mmdb_control(out, 5, 2);
                out.extend_from_slice(&v.to_be_bytes());
            }
            MmdbValue::U32(v) => {
                mmdb_control(out, 6, 4);
                out.extend_from_slice(&v.to_be_bytes());
            }
            MmdbValue::U64(v) => {
                mmdb_control(out, 9, 8);
                out.extend_from_slice(&v.to_be_bytes());
            }
            MmdbValue::Map(pairs) => {
                mmdb_control(out, 7, pairs.len());
                for (key, value) in pairs {
                    MmdbValue::Str(key.clone()).encode(out);
                    value.encode(out);
                }
            }
            MmdbValue::Array(items) => {
                mmdb_control(out, 11, items.len());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

/// Control byte(s): type in the top 3 bits, types above 7 in a second byte
fn mmdb_control(out: &mut Vec<u8>, type_num: u8, size: usize) {
    let (size_bits, extra) = match size {
        0..=28 => (size as u8, Vec::new()),
        29..=284 => (29, vec![(size - 29) as u8]),
        285..=65820 => (30, ((size - 285) as u16).to_be_bytes().to_vec()),
        _ => (31, ((size - 65821) as u32).to_be_bytes()[1..].to_vec()),
    };
    if type_num <= 7 {
        out.push((type_num << 5) | size_bits);
    } else {
        out.push(size_bits);
        out.push(type_num - 7);
    }
    out.extend_from_slice(&extra);
}

#[derive(Debug, Clone, Copy)]
enum MmdbSlot {
    Empty,
    Node(usize),
    Data(usize),
}

/// IPv4 MaxMind DB with 24-bit records
pub struct MmdbFixture {
    database_type: String,
    networks: Vec<(u32, u8, MmdbValue)>,
}

impl MmdbFixture {
    pub fn new(database_type: &str) -> Self {
        Self {
            database_type: database_type.to_string(),
            networks: Vec::new(),
        }
    }

    /// Map `network` (CIDR, prefix length 1..=32) to `value`; networks must not nest
    pub fn insert(mut self, network: &str, value: MmdbValue) -> Self {
        let (addr, len) = network.split_once('/').expect("fixture CIDR");
        let addr: std::net::Ipv4Addr = addr.parse().expect("fixture network");
        self.networks.push((u32::from(addr), len.parse().expect("fixture prefix"), value));
        self
    }

    pub fn write(&self) -> NamedTempFile {
        write_temp(&self.build())
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        let mut tree = vec![[MmdbSlot::Empty; 2]];

        for (network, prefix_len, value) in &self.networks {
            let offset = data.len();
            value.encode(&mut data);

            let mut node = 0;
            for depth in 0..*prefix_len {
                let bit = ((network >> (31 - depth)) & 1) as usize;
                if depth + 1 == *prefix_len {
                    tree[node][bit] = MmdbSlot::Data(offset);
                } else {
                    let slot = tree[node][bit];
                    node = match slot {
                        MmdbSlot::Node(next) => next,
                        _ => {
                            tree.push([MmdbSlot::Empty; 2]);
                            let next = tree.len() - 1;
                            tree[node][bit] = MmdbSlot::Node(next);
                            next
                        }
                    };
                }
            }
        }

        let node_count = tree.len();
        let mut bytes = Vec::new();
        for slot in tree.iter().flatten() {
            let record = match slot {
                MmdbSlot::Empty => node_count,
                MmdbSlot::Node(next) => *next,
                MmdbSlot::Data(offset) => node_count + 16 + offset,
            };
            bytes.extend_from_slice(&(record as u32).to_be_bytes()[1..]);
        }
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&data);

        bytes.extend_from_slice(b"\xab\xcd\xefMaxMind.com");
        let metadata = MmdbValue::map([
            ("binary_format_major_version", MmdbValue::U16(2)),
            ("binary_format_minor_version", MmdbValue::U16(0)),
            ("build_epoch", MmdbValue::U64(1_735_689_600)),
            ("database_type", MmdbValue::str(&self.database_type)),
            ("description", MmdbValue::map([("en", MmdbValue::str("ipgeo test data"))])),
            ("ip_version", MmdbValue::U16(4)),
            ("languages", MmdbValue::Array(vec![MmdbValue::str("en"), MmdbValue::str("zh-CN")])),
            ("node_count", MmdbValue::U32(node_count as u32)),
            ("record_size", MmdbValue::U16(24)),
        ]);
        metadata.encode(&mut bytes);
        bytes
    }
}

/// What a [`FakeBackend`] answers
pub enum FakeResponse {
    Record(RawRecord),
    Missing,
    Fail(String),
}

/// In-memory backend that counts lookups
pub struct FakeBackend {
    kind: BackendKind,
    response: FakeResponse,
    calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(kind: BackendKind, response: FakeResponse) -> Arc<Self> {
        Arc::new(Self {
            kind,
            response,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn lookup(&self, _ip: IpAddr) -> Result<Option<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            FakeResponse::Record(record) => Ok(Some(record.clone())),
            FakeResponse::Missing => Ok(None),
            FakeResponse::Fail(message) => Err(GeoError::corrupted(message.clone())),
        }
    }
}
