use crate::hash::TagHash;
use crate::package::{
    Hash64Entry, PackageEntry, PackageHeader,
    error::{PackageError, Result},
};
use binrw::BinRead;
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

/// Parsed header and tables of one package file
///
/// Entry data is not copied; callers read it from the file or from the
/// buffer passed to [`PackageIndex::parse`] with [`PackageIndex::entry_data`].
#[derive(Debug, Clone)]
pub struct PackageIndex {
    /// File header
    pub header: PackageHeader,
    /// Entry table, indexed by entry index
    pub entries: Vec<PackageEntry>,
    /// Hash64 translation rows
    pub hash64: Vec<Hash64Entry>,
}

impl PackageIndex {
    /// Parse header, entry table and hash64 table from the start of a package
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = PackageHeader::read(&mut cursor)?;
        header.validate()?;

        check_table(
            "entry",
            header.entry_table_offset,
            header.entry_count,
            PackageEntry::SIZE,
            data.len(),
        )?;
        check_table(
            "hash64",
            header.hash64_table_offset,
            header.hash64_count,
            Hash64Entry::SIZE,
            data.len(),
        )?;

        cursor.set_position(u64::from(header.entry_table_offset));
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            entries.push(PackageEntry::read(&mut cursor)?);
        }

        cursor.set_position(u64::from(header.hash64_table_offset));
        let mut hash64 = Vec::with_capacity(header.hash64_count as usize);
        for _ in 0..header.hash64_count {
            hash64.push(Hash64Entry::read(&mut cursor)?);
        }

        Ok(Self {
            header,
            entries,
            hash64,
        })
    }

    /// Package id from the header
    pub fn package_id(&self) -> u16 {
        self.header.package_id
    }

    /// Entry table row
    pub fn entry(&self, index: u16) -> Option<&PackageEntry> {
        self.entries.get(usize::from(index))
    }

    /// Hash of an entry in this package
    pub fn tag_hash(&self, index: u16) -> Result<TagHash> {
        Ok(TagHash::encode(self.header.package_id, index)?)
    }

    /// Stored bytes of an entry inside `data`, still compressed if flagged
    pub fn entry_data<'a>(&self, data: &'a [u8], index: u16) -> Result<&'a [u8]> {
        let entry = self.entry(index).ok_or(PackageError::NoSuchEntry(index))?;
        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.size as usize)
            .filter(|&end| end <= data.len())
            .ok_or(PackageError::EntryOutOfBounds {
                index,
                offset: entry.offset,
                size: entry.size,
                file_size: data.len(),
            })?;
        Ok(&data[start..end])
    }
}

fn check_table(
    table: &'static str,
    offset: u32,
    count: u32,
    row_size: usize,
    file_size: usize,
) -> Result<()> {
    let end = (count as usize)
        .checked_mul(row_size)
        .and_then(|len| len.checked_add(offset as usize));
    match end {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(PackageError::TableOutOfBounds {
            table,
            offset,
            count,
            file_size,
        }),
    }
}

/// Inflate a zlib-compressed entry
pub fn inflate_entry(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
