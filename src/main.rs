//! Entry point for lpcpatch.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Set up logging with `tracing-subscriber`.
//! 3. Patch (or dry-run, or verify) the checksum of the given file for the
//!    ARM backend (the only supported architecture).
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lpcpatch::arch::arm::Arm;
use lpcpatch::config::Config;
use lpcpatch::patch::{Mode, Patcher};
use lpcpatch::PatchError;

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mode = if config.dry_run { Mode::DryRun } else { Mode::Write };
    let patcher = Patcher::new(Arm, config.slot).with_mode(mode);
    let path = &config.file;

    if config.verify {
        let verification = patcher
            .verify_file(path)
            .map_err(|err| explain(err, &format!("failed to verify {}", path.display())))?;
        println!("stored checksum:   {:08x}", verification.stored);
        println!("expected checksum: {:08x}", verification.expected);
        if !verification.is_valid() {
            anyhow::bail!("checksum of {} is not valid", path.display());
        }
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    patcher
        .patch_file(path, &mut stdout)
        .map_err(|err| explain(err, &format!("failed to patch {}", path.display())))?;
    Ok(())
}

/// Wraps a library error with context. When the file is valid ELF but not
/// laid out like an LPC image, the cause is stated first and followed by a hint.
fn explain(err: PatchError, what: &str) -> anyhow::Error {
    if err.is_structural() {
        anyhow::anyhow!(
            "{what}: {err}\n\
             probably you've passed an .elf file that this program doesn't understand"
        )
    } else {
        anyhow::Error::new(err).context(what.to_string())
    }
}
