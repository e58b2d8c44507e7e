//! LPC checksum patcher library.
//!
//! This library provides the core components for the `lpcpatch` tool.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `arch`: Target architecture check.
//! - `container`: Layout-preserving ELF reader/writer.
//! - `error`: Error types.
//! - `section`: Section attribute records.
//! - `locator`: Finds the section holding the vector table.
//! - `checksum`: Vector table checksum.
//! - `patch`: Orchestration of a single patch operation.

pub mod arch;
pub mod checksum;
pub mod config;
pub mod container;
pub mod error;
pub mod locator;
pub mod patch;
pub mod section;

pub use error::PatchError;
