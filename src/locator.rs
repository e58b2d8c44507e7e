//! Vector table section lookup.
//!
//! The vector table lives at the very start of the code that is loaded at
//! address 0. The first section that is allocated, executable, loaded at 0 and
//! large enough to hold the table is taken as the one containing it.

use crate::checksum::VECTOR_TABLE_SIZE;
use crate::error::{PatchError, Result};
use crate::section::Section;

/// Whether `section` can hold the vector table.
pub fn is_vector_section(section: &Section) -> bool {
    section.is_alloc()
        && section.is_executable()
        && section.address == 0
        && section.size >= VECTOR_TABLE_SIZE as u64
}

/// Returns the first section, in file order, that holds the vector table.
pub fn find_target_section(sections: &[Section]) -> Result<&Section> {
    let found = sections.iter().find(|section| is_vector_section(section));
    match found {
        Some(section) => {
            tracing::debug!(
                "vector table in section {} (index {}, {} bytes at offset {:#x})",
                section.name,
                section.index.0,
                section.size,
                section.offset
            );
            Ok(section)
        }
        None => Err(PatchError::NoMatch),
    }
}
