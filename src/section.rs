//! Section metadata.
//!
//! A `Section` is a plain attribute record copied out of the ELF section
//! header table when the file is opened. It never borrows the file data.

use object::elf::{SHF_ALLOC, SHF_EXECINSTR, SHT_NOBITS};
use object::read::SectionIndex;

/// One entry of the section header table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Position in the section header table.
    pub index: SectionIndex,
    /// Name from the section header string table (lossy UTF-8).
    pub name: String,
    /// Raw `sh_type`.
    pub kind: u32,
    /// Raw `sh_flags`.
    pub flags: u64,
    /// Load address (`sh_addr`).
    pub address: u64,
    /// Size in bytes (`sh_size`).
    pub size: u64,
    /// File offset of the content (`sh_offset`).
    pub offset: u64,
}

impl Section {
    pub fn is_alloc(&self) -> bool {
        self.flags & u64::from(SHF_ALLOC) != 0
    }

    pub fn is_executable(&self) -> bool {
        self.flags & u64::from(SHF_EXECINSTR) != 0
    }

    /// Whether the section occupies bytes in the file.
    pub fn has_file_data(&self) -> bool {
        self.kind != SHT_NOBITS && self.size != 0
    }
}
