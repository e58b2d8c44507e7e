//! Configuration module.
//!
//! This module defines the command-line interface (CLI) using `clap`.
//! Usage errors (missing file, malformed or out-of-range slot) are rejected
//! here, before any file is opened.

use clap::Parser;
use std::path::PathBuf;

use crate::checksum::ChecksumSlot;

/// Updates the LPC vector table checksum in ARM ELF binaries.
///
/// The boot ROM of NXP LPC microcontrollers refuses to start an image whose
/// first eight vectors do not add up to zero. This tool computes the missing
/// word and writes it into the ELF file in place, without changing its layout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about, arg_required_else_help = true)]
pub struct Config {
    /// ELF file to patch in place
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: PathBuf,

    /// Position of the checksum in the vector table.
    ///
    /// 7 for LPC17xx, LPC43xx and most other LPC parts; 5 for the LPC2000 family.
    #[arg(
        short = 'c',
        long = "checksum-slot",
        value_name = "SLOT",
        default_value_t = ChecksumSlot::default(),
        allow_negative_numbers = true
    )]
    pub slot: ChecksumSlot,

    /// Compute and print the checksum without writing the file
    #[arg(long, conflicts_with = "verify")]
    pub dry_run: bool,

    /// Only check whether the stored checksum is correct
    #[arg(long)]
    pub verify: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", help = "Set the logging level")]
    pub log_level: String,
}
