//! Rust-level fallibility, kept deliberately separate from architectural
//! exceptions: an `IllegalInstruction` trap is a normal, expected outcome
//! of [`crate::core::Core::tick`] and is never represented as an `Err`.
//! The errors here are construction-time/build-time problems in the
//! simulator itself.

use thiserror::Error;

/// Failure building the 256-entry microcode store (see
/// [`crate::microcode::store::build`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("micro-PC {0:#04x} is out of range of the 256-entry store")]
    AddressOutOfRange(u16),
    #[error("mapping table entry for opcode {0:#04x} targets micro-PC {1:#04x}, out of range")]
    MapTargetOutOfRange(u8, u8),
}
