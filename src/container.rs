//! ELF container access.
//!
//! `Container` owns a memory map of one 32-bit ELF file for the duration of a
//! patch operation, writable unless opened with `open_read_only`. The header and section table are parsed
//! once at open time into owned `Section` records; afterwards all content
//! access goes through the map by file offset.
//!
//! Writes are buffered per section and only reach the file on `commit`.
//! A commit copies each dirty buffer back over the exact byte range the
//! section already occupies. Nothing else in the file is touched: section
//! order, offsets, padding and every header stay bit-identical. Sizes can
//! never change because `write_content` rejects buffers of a different length.

use memmap2::{Mmap, MmapMut};
use object::elf::{self, FileHeader32};
use object::read::elf::{FileHeader, SectionHeader};
use object::read::SectionIndex;
use object::{Endianness, FileKind};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::ops::{Deref, Range};
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result};
use crate::section::Section;

/// Metadata extracted from the ELF headers.
struct Headers {
    endian: Endianness,
    machine: u16,
    sections: Vec<Section>,
}

/// The file mapping, writable unless opened for inspection only.
enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

impl Deref for Mapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Mapping::ReadWrite(map) => map,
            Mapping::ReadOnly(map) => map,
        }
    }
}

/// An open ELF file.
pub struct Container {
    path: PathBuf,
    map: Mapping,
    // Held so the descriptor lives exactly as long as the mapping.
    _file: File,
    endian: Endianness,
    machine: u16,
    sections: Vec<Section>,
    dirty: BTreeMap<usize, Vec<u8>>,
}

impl Container {
    /// Opens `path` for reading and writing and parses its section table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), true)
    }

    /// Opens `path` for inspection only. Writes are rejected with `ReadOnly`,
    /// so read-only files and mounts can still be checked.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path.as_ref(), false)
    }

    fn open_with(path: &Path, writable: bool) -> Result<Self> {
        let path = path.to_path_buf();
        let open_error = |source: std::io::Error| PatchError::Open {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&path)
            .map_err(open_error)?;

        let len = file.metadata().map_err(open_error)?.len();
        if len == 0 {
            return Err(PatchError::NotAnObjectFile);
        }

        // SAFETY: the map is private to this process for the lifetime of the
        // container; concurrent modification by other processes is not supported.
        let map = if writable {
            Mapping::ReadWrite(unsafe { MmapMut::map_mut(&file) }.map_err(open_error)?)
        } else {
            Mapping::ReadOnly(unsafe { Mmap::map(&file) }.map_err(open_error)?)
        };

        let headers = parse_headers(&map)?;
        tracing::debug!(
            "opened {}{}: e_machine {} ({} endian), {} sections",
            path.display(),
            if writable { "" } else { " read-only" },
            headers.machine,
            if headers.endian == Endianness::Little { "little" } else { "big" },
            headers.sections.len()
        );

        Ok(Self {
            path,
            map,
            _file: file,
            endian: headers.endian,
            machine: headers.machine,
            sections: headers.sections,
            dirty: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte order declared in the ELF identification.
    pub fn endian(&self) -> Endianness {
        self.endian
    }

    /// Raw `e_machine` tag.
    pub fn machine(&self) -> u16 {
        self.machine
    }

    /// All sections in section header table order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: SectionIndex) -> Result<&Section> {
        self.sections
            .get(index.0)
            .ok_or(PatchError::NoSuchSection(index.0))
    }

    /// Current content of a section, including any uncommitted write.
    pub fn read_content(&self, index: SectionIndex) -> Result<&[u8]> {
        if let Some(buffer) = self.dirty.get(&index.0) {
            return Ok(buffer.as_slice());
        }
        let section = self.section(index)?;
        if !section.has_file_data() {
            return Err(PatchError::EmptySection(section.name.clone()));
        }
        let range = self.file_range(section)?;
        Ok(&self.map[range])
    }

    /// Replaces the content of a section in memory and marks it dirty.
    ///
    /// The new content must be exactly as long as the section.
    pub fn write_content(&mut self, index: SectionIndex, content: Vec<u8>) -> Result<()> {
        if let Mapping::ReadOnly(_) = self.map {
            return Err(PatchError::ReadOnly(self.path.clone()));
        }
        let section = self.section(index)?;
        if !section.has_file_data() {
            return Err(PatchError::EmptySection(section.name.clone()));
        }
        if content.len() as u64 != section.size {
            return Err(PatchError::SizeMismatch {
                name: section.name.clone(),
                expected: section.size,
                actual: content.len(),
            });
        }
        tracing::trace!("marking section {} dirty", section.name);
        self.dirty.insert(index.0, content);
        Ok(())
    }

    /// Whether any section has uncommitted changes.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Flushes every dirty section back to its original place in the file.
    pub fn commit(&mut self) -> Result<()> {
        let dirty = std::mem::take(&mut self.dirty);
        for (index, content) in dirty {
            let section = &self.sections[index];
            let range = self.file_range(section)?;
            tracing::debug!(
                "writing {} bytes of {} at offset {:#x}",
                content.len(),
                section.name,
                range.start
            );
            // Only writable containers can hold dirty sections.
            let Mapping::ReadWrite(map) = &mut self.map else {
                return Err(PatchError::ReadOnly(self.path.clone()));
            };
            map[range.clone()].copy_from_slice(&content);
            map.flush_range(range.start, range.len())
                .map_err(PatchError::Write)?;
        }
        Ok(())
    }

    /// Releases the mapping and the file descriptor. Uncommitted changes are
    /// discarded. Dropping the container has the same effect.
    pub fn close(self) {
        if self.is_dirty() {
            tracing::debug!("discarding uncommitted changes to {}", self.path.display());
        }
    }

    fn file_range(&self, section: &Section) -> Result<Range<usize>> {
        let truncated = || PatchError::Truncated {
            name: section.name.clone(),
        };
        let start = usize::try_from(section.offset).map_err(|_| truncated())?;
        let size = usize::try_from(section.size).map_err(|_| truncated())?;
        let end = start.checked_add(size).ok_or_else(truncated)?;
        if end > self.map.len() {
            return Err(truncated());
        }
        Ok(start..end)
    }
}

/// Reads the file header and the section header table. Nothing else in the
/// file (symbol tables, program headers, notes) is looked at.
fn parse_headers(data: &[u8]) -> Result<Headers> {
    match FileKind::parse(data) {
        Ok(FileKind::Elf32) => {}
        Ok(FileKind::Elf64) => return Err(PatchError::UnsupportedClass),
        Ok(_) | Err(_) => return Err(PatchError::NotAnObjectFile),
    }

    // `elf::Ident` is not `Pod`, so read its `version` byte directly.
    let ident = data
        .get(..std::mem::size_of::<elf::Ident>())
        .ok_or(PatchError::NotAnObjectFile)?;
    let version = ident[std::mem::offset_of!(elf::Ident, version)];
    if version != elf::EV_CURRENT {
        return Err(PatchError::VersionUnsupported(version));
    }

    let header = FileHeader32::<Endianness>::parse(data)?;
    let endian = header.endian()?;
    let table = header.sections(endian, data)?;

    let mut sections = Vec::with_capacity(table.len());
    for (index, raw) in table.iter().enumerate() {
        let name = table.section_name(endian, raw)?;
        sections.push(Section {
            index: SectionIndex(index),
            name: String::from_utf8_lossy(name).into_owned(),
            kind: raw.sh_type(endian),
            flags: u64::from(raw.sh_flags(endian)),
            address: u64::from(raw.sh_addr(endian)),
            size: u64::from(raw.sh_size(endian)),
            offset: u64::from(raw.sh_offset(endian)),
        });
    }

    Ok(Headers {
        endian,
        machine: header.e_machine(endian),
        sections,
    })
}
