//! ARM backend (NXP LPC parts).

use super::Target;
use object::elf::EM_ARM;

/// 32-bit ARM images for LPC microcontrollers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arm;

impl Target for Arm {
    fn name(&self) -> &'static str {
        "ARM"
    }

    fn machine(&self) -> u16 {
        EM_ARM
    }
}
