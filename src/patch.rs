//! Patch orchestration.
//!
//! `Patcher` ties the pieces together for one file:
//! 1. Open the ELF container.
//! 2. Check the header architecture against the target.
//! 3. Locate the section holding the vector table.
//! 4. Compute the checksum and splice it into a copy of the section content.
//! 5. Report the old and new values, then commit.
//!
//! The container is dropped on every return path, which releases the map and
//! the file descriptor whether or not the patch succeeded.

use object::read::SectionIndex;
use std::io::Write;
use std::path::Path;

use crate::arch::Target;
use crate::checksum::{ChecksumSlot, VectorTable};
use crate::container::Container;
use crate::error::{PatchError, Result};
use crate::locator::find_target_section;

/// Whether the computed checksum is written back to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Write,
    /// Compute and report only; the file is left untouched.
    DryRun,
}

/// Outcome of patching one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub section: String,
    pub section_index: SectionIndex,
    pub old_checksum: u32,
    pub new_checksum: u32,
    /// False for dry runs.
    pub committed: bool,
}

/// Result of checking a file without modifying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub section: String,
    pub stored: u32,
    pub expected: u32,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.stored == self.expected
    }
}

pub struct Patcher<T: Target> {
    target: T,
    slot: ChecksumSlot,
    mode: Mode,
}

impl<T: Target> Patcher<T> {
    pub fn new(target: T, slot: ChecksumSlot) -> Self {
        Self {
            target,
            slot,
            mode: Mode::Write,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Patches the checksum of the file at `path` in place.
    ///
    /// The old and new checksum are written to `out` before anything is
    /// committed.
    pub fn patch_file<W: Write>(&self, path: impl AsRef<Path>, out: &mut W) -> Result<PatchReport> {
        let mut container = Container::open(path)?;
        let mut report = self.patch(&mut container)?;

        writeln!(out, "old checksum: {:08x}", report.old_checksum).map_err(PatchError::Report)?;
        writeln!(out, "new checksum: {:08x}", report.new_checksum).map_err(PatchError::Report)?;

        if self.mode == Mode::Write {
            container.commit()?;
            report.committed = true;
            tracing::info!(
                "patched {} (slot {} of {})",
                container.path().display(),
                self.slot,
                report.section
            );
        } else {
            tracing::info!("dry run, {} left unchanged", container.path().display());
        }
        container.close();
        Ok(report)
    }

    /// Computes the checksum and stages it in `container` without committing.
    pub fn patch(&self, container: &mut Container) -> Result<PatchReport> {
        self.check_architecture(container)?;

        let (index, name) = {
            let section = find_target_section(container.sections())?;
            (section.index, section.name.clone())
        };
        let endian = container.endian();
        let mut content = container.read_content(index)?.to_vec();
        let table = VectorTable::from_bytes(&content, endian)
            .ok_or_else(|| PatchError::EmptySection(name.clone()))?;

        let old_checksum = table.get(self.slot);
        let patched = table.with_checksum(self.slot);
        let new_checksum = patched.get(self.slot);
        tracing::debug!("vector table {:08x?}", table.words());

        patched.write_to(&mut content, endian);
        container.write_content(index, content)?;

        Ok(PatchReport {
            section: name,
            section_index: index,
            old_checksum,
            new_checksum,
            committed: false,
        })
    }

    /// Reads the vector table of `path` and reports whether its checksum is
    /// already correct. The file is opened read-only and never written.
    pub fn verify_file(&self, path: impl AsRef<Path>) -> Result<Verification> {
        let container = Container::open_read_only(path)?;
        self.check_architecture(&container)?;

        let section = find_target_section(container.sections())?;
        let content = container.read_content(section.index)?;
        let table = VectorTable::from_bytes(content, container.endian())
            .ok_or_else(|| PatchError::EmptySection(section.name.clone()))?;

        Ok(Verification {
            section: section.name.clone(),
            stored: table.get(self.slot),
            expected: table.checksum(self.slot),
        })
    }

    fn check_architecture(&self, container: &Container) -> Result<()> {
        let found = container.machine();
        if found != self.target.machine() {
            return Err(PatchError::UnsupportedArchitecture {
                found,
                expected: self.target.name(),
            });
        }
        Ok(())
    }
}
