//! Target abstraction.
//!
//! A `Target` names the instruction set a patched image must be built for.
//! The patcher is generic over it so the architecture check stays out of the
//! orchestration code.

pub mod arm;

/// A microcontroller family whose boot ROM validates a vector table checksum.
pub trait Target {
    /// Human readable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// The `e_machine` value in the ELF header of a valid image.
    fn machine(&self) -> u16;
}
