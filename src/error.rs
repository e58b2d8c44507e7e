//! Error types.
//!
//! Every failure is terminal for a patch operation. The variants follow the
//! stages where they can happen: opening and parsing the file, checking the
//! architecture, locating the vector table, and writing the result back.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while opening, inspecting or patching an ELF file.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unable to open file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not an ELF object file")]
    NotAnObjectFile,

    #[error("only 32-bit ELF files are supported")]
    UnsupportedClass,

    #[error("unsupported ELF version {0}")]
    VersionUnsupported(u8),

    #[error("malformed ELF file")]
    Malformed(#[from] object::read::Error),

    #[error("section {name} extends past the end of the file")]
    Truncated { name: String },

    #[error("sorry, this is not an {expected} binary (e_machine {found})")]
    UnsupportedArchitecture { found: u16, expected: &'static str },

    #[error("no allocated, executable section of at least 32 bytes is loaded at address 0")]
    NoMatch,

    #[error("executable section {0} seems to be empty")]
    EmptySection(String),

    #[error("no section with index {0}")]
    NoSuchSection(usize),

    #[error("section {name} holds {expected} bytes, refusing to write {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: usize,
    },

    #[error("{} was opened read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("failed to write changes back to the file")]
    Write(#[source] io::Error),

    #[error("failed to write the checksum report")]
    Report(#[source] io::Error),
}

impl PatchError {
    /// True when the file parsed fine but its layout is not one this tool
    /// knows how to patch.
    pub fn is_structural(&self) -> bool {
        matches!(self, PatchError::NoMatch | PatchError::EmptySection(_))
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
