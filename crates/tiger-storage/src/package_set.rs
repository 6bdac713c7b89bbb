//! Package set scanning and entry metadata.
//!
//! A scan maps every `*.pkg` file in the package directory, parses its
//! header and tables and keeps the highest patch of each package id. The
//! resulting [`PackageSet`] is immutable; a reload builds a new one.

use crate::{PACKAGE_EXTENSION, Result, StorageError};
use memmap2::MmapOptions;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiger_formats::hash::MAX_PACKAGE_ID;
use tiger_formats::package::{Hash64Entry, PackageEntry, PackageHeader, PackageIndex};
use tiger_formats::{ContentId, TagHash, TagHash64};
use tracing::{debug, info, warn};

/// Location and shape of one package entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Owning package.
    pub package_id: u16,
    /// Index inside the package.
    pub entry_index: u16,
    /// Stored (possibly compressed) length.
    pub size: u32,
    /// Byte offset inside the package file.
    pub offset: u32,
    /// Canonical entry for redirected content, [`TagHash::NONE`] otherwise.
    pub reference: TagHash,
    /// Class hash of the stored tag.
    pub type_tag: u32,
    /// File type byte.
    pub file_type: u8,
    /// File subtype byte.
    pub file_subtype: u8,
    /// Entry flags.
    pub flags: u16,
}

impl EntryMetadata {
    fn from_entry(package_id: u16, entry_index: u16, entry: &PackageEntry) -> Self {
        Self {
            package_id,
            entry_index,
            size: entry.size,
            offset: entry.offset,
            reference: entry.reference,
            type_tag: entry.type_tag,
            file_type: entry.file_type,
            file_subtype: entry.file_subtype,
            flags: entry.flags,
        }
    }

    /// Whether the entry holds no data and points at `reference`.
    pub fn is_redirect(&self) -> bool {
        self.flags & tiger_formats::package::ENTRY_FLAG_REDIRECT != 0
    }

    /// Whether the entry data is zlib-compressed.
    pub fn is_compressed(&self) -> bool {
        self.flags & tiger_formats::package::ENTRY_FLAG_COMPRESSED != 0
    }

    /// Hash addressing this entry.
    pub fn tag_hash(&self) -> TagHash {
        TagHash::encode(self.package_id, self.entry_index).unwrap_or(TagHash::NONE)
    }
}

/// One package file kept by a scan.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Path of the package file.
    pub path: PathBuf,
    /// Package header.
    pub header: PackageHeader,
    /// Entry table.
    pub entries: Vec<PackageEntry>,
    /// Size of the file in bytes.
    pub file_size: u64,
}

impl PackageInfo {
    /// Package id from the header.
    pub fn package_id(&self) -> u16 {
        self.header.package_id
    }

    /// Patch level from the header.
    pub fn patch_id(&self) -> u16 {
        self.header.patch_id
    }
}

/// Result of scanning one directory, before the hash64 table is built.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Kept packages, sorted by package id.
    pub packages: Vec<PackageInfo>,
    /// Hash64 rows of the kept packages, same order.
    pub hash64_rows: Vec<Vec<Hash64Entry>>,
}

impl ScanResult {
    /// Fingerprint of the package set, stable across scans of unchanged files.
    ///
    /// First eight bytes of an MD5 over every kept package's id, patch,
    /// build and file size followed by its hash64 rows, in package id order.
    pub fn fingerprint(&self) -> u64 {
        let mut context = md5::Context::new();
        for (package, rows) in self.packages.iter().zip(&self.hash64_rows) {
            context.consume(package.header.package_id.to_le_bytes());
            context.consume(package.header.patch_id.to_le_bytes());
            context.consume(package.header.build_id.to_le_bytes());
            context.consume(package.file_size.to_le_bytes());
            context.consume((rows.len() as u64).to_le_bytes());
            for row in rows {
                context.consume(row.hash64.0.to_le_bytes());
                context.consume(row.hash32.0.to_le_bytes());
            }
        }

        let digest = context.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.0[..8]);
        u64::from_le_bytes(head)
    }

    /// Translation table built from the scanned rows.
    ///
    /// The first row wins when a 64-bit hash appears more than once.
    pub fn build_hash64_table(&self) -> HashMap<TagHash64, TagHash> {
        let mut table = HashMap::new();
        for row in self.hash64_rows.iter().flatten() {
            if row.hash64.is_valid() && row.hash32.is_valid() {
                table.entry(row.hash64).or_insert(row.hash32);
            }
        }
        table
    }
}

/// Scan `dir` (non-recursive) for package files.
///
/// Files whose header cannot be parsed are skipped with a warning. Fails with
/// [`StorageError::NoPackages`] when nothing usable is found.
pub fn scan_directory(dir: &Path) -> Result<ScanResult> {
    let mut selected: HashMap<u16, (PackageInfo, Vec<Hash64Entry>)> = HashMap::new();

    for dir_entry in std::fs::read_dir(dir)? {
        let path = dir_entry?.path();
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(PACKAGE_EXTENSION)
        {
            continue;
        }

        let (info, rows) = match read_package(&path) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping package {}: {}", path.display(), e);
                continue;
            }
        };

        let package_id = info.package_id();
        match selected.get(&package_id) {
            Some((existing, _)) if existing.patch_id() >= info.patch_id() => {
                debug!(
                    "Ignoring {} (patch {}), patch {} already selected for package {:#x}",
                    path.display(),
                    info.patch_id(),
                    existing.patch_id(),
                    package_id
                );
            }
            _ => {
                selected.insert(package_id, (info, rows));
            }
        }
    }

    if selected.is_empty() {
        return Err(StorageError::NoPackages(dir.to_path_buf()));
    }

    let mut kept: Vec<_> = selected.into_values().collect();
    kept.sort_by_key(|(info, _)| info.package_id());

    let (packages, hash64_rows) = kept.into_iter().unzip();
    Ok(ScanResult {
        packages,
        hash64_rows,
    })
}

fn read_package(path: &Path) -> Result<(PackageInfo, Vec<Hash64Entry>)> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    if file_size < PackageHeader::SIZE as u64 {
        return Err(StorageError::InvalidFormat(format!(
            "file is {file_size} bytes, shorter than a package header"
        )));
    }

    #[allow(unsafe_code)]
    let mmap = unsafe { MmapOptions::new().map(&file)? };

    let index = PackageIndex::parse(&mmap)?;
    let out_of_bounds = (0..index.entries.len())
        .filter(|&slot| {
            let entry = &index.entries[slot];
            !entry.is_redirect() && index.entry_data(&mmap, slot as u16).is_err()
        })
        .count();
    if out_of_bounds > 0 {
        warn!(
            "{}: {} entries point past the end of the file",
            path.display(),
            out_of_bounds
        );
    }

    Ok((
        PackageInfo {
            path: path.to_path_buf(),
            header: index.header,
            entries: index.entries,
            file_size,
        },
        index.hash64,
    ))
}

/// Immutable metadata of one package set generation.
#[derive(Debug)]
pub struct PackageSet {
    root: PathBuf,
    /// Indexed by package id.
    packages: Vec<Option<Arc<PackageInfo>>>,
    hash64: HashMap<TagHash64, TagHash>,
    fingerprint: u64,
}

impl PackageSet {
    /// Scan `root` and build the hash64 table from the package files.
    pub fn scan(root: &Path) -> Result<Self> {
        let scan = scan_directory(root)?;
        Ok(Self::from_scan(root, scan, None))
    }

    /// Assemble a set from a scan, optionally with a hash64 table loaded
    /// from elsewhere.
    pub fn from_scan(
        root: &Path,
        scan: ScanResult,
        hash64: Option<HashMap<TagHash64, TagHash>>,
    ) -> Self {
        let fingerprint = scan.fingerprint();
        let hash64 = hash64.unwrap_or_else(|| scan.build_hash64_table());

        let mut packages = vec![None; usize::from(MAX_PACKAGE_ID) + 1];
        for info in scan.packages {
            let slot = usize::from(info.package_id());
            packages[slot] = Some(Arc::new(info));
        }

        let set = Self {
            root: root.to_path_buf(),
            packages,
            hash64,
            fingerprint,
        };
        info!(
            "Package set at {}: {} packages, {} entries, {} hash64 mappings",
            set.root.display(),
            set.package_count(),
            set.entry_count(),
            set.hash64.len()
        );
        set
    }

    /// Directory the set was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fingerprint of the kept packages.
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Package by id.
    pub fn package(&self, package_id: u16) -> Option<&Arc<PackageInfo>> {
        self.packages.get(usize::from(package_id))?.as_ref()
    }

    /// Kept packages in id order.
    pub fn packages(&self) -> impl Iterator<Item = &Arc<PackageInfo>> {
        self.packages.iter().flatten()
    }

    /// Number of kept packages.
    pub fn package_count(&self) -> usize {
        self.packages().count()
    }

    /// Total entries over all kept packages.
    pub fn entry_count(&self) -> usize {
        self.packages().map(|package| package.entries.len()).sum()
    }

    /// Hash64 translation table.
    pub fn hash64_table(&self) -> &HashMap<TagHash64, TagHash> {
        &self.hash64
    }

    /// Metadata of the entry addressed by `tag`.
    pub fn metadata(&self, tag: TagHash) -> Result<EntryMetadata> {
        let (package_id, entry_index) = tag
            .decode()
            .map_err(|_| StorageError::InvalidIdentifier(ContentId::Local(tag)))?;

        let entry = self
            .package(package_id)
            .and_then(|package| package.entries.get(usize::from(entry_index)))
            .ok_or(StorageError::NotFound(ContentId::Local(tag)))?;

        Ok(EntryMetadata::from_entry(package_id, entry_index, entry))
    }

    /// Translate a 64-bit hash into a package hash.
    pub fn global_to_local(&self, hash: TagHash64) -> Result<TagHash> {
        if !hash.is_valid() {
            return Err(StorageError::InvalidIdentifier(ContentId::Global(hash)));
        }
        self.hash64
            .get(&hash)
            .copied()
            .ok_or(StorageError::NotFound(ContentId::Global(hash)))
    }

    /// Reduce any byte-addressing identifier to a package hash.
    pub fn canonicalize(&self, id: ContentId) -> Result<TagHash> {
        match id {
            ContentId::Local(tag) if tag.is_valid() => Ok(tag),
            ContentId::Global(hash) => self.global_to_local(hash),
            ContentId::Local(_) | ContentId::String(_) => Err(StorageError::InvalidIdentifier(id)),
        }
    }
}
