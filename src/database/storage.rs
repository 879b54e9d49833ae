//! Read-only byte storage backing the binary decoders
//!
//! Files are memory-mapped by default; small or hot databases can instead be read
//! fully into memory. Both variants deref to `&[u8]` so decoders do not care which.

use crate::error::{GeoError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

pub enum Storage {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Storage {
    /// Memory-map a database file
    pub fn map(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| GeoError::DatabaseNotFound(format!("{:?}: {}", path, e)))?;
        // Safety: the mapping is read-only and database files are not modified while in use.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Storage::Mapped(mmap))
    }

    /// Read a database file fully into memory
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| GeoError::DatabaseNotFound(format!("{:?}: {}", path, e)))?;
        Ok(Storage::Buffered(bytes))
    }

    /// Bounds-checked sub-slice
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(GeoError::IndexOutOfBounds(offset, self.len()))?;
        self.get(offset..end)
            .ok_or(GeoError::IndexOutOfBounds(end, self.len()))
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn read_u16_le(&self, offset: usize) -> Result<u16> {
        Ok(u16::from_le_bytes(self.slice(offset, 2)?.try_into()?))
    }

    pub fn read_u32_le(&self, offset: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.slice(offset, 4)?.try_into()?))
    }
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Storage::Mapped(mmap) => mmap,
            Storage::Buffered(bytes) => bytes,
        }
    }
}
