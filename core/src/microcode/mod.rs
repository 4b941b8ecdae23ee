//! The microcode engine: the horizontal word format (component A's
//! payload), the mapping table (component E), and the sequencer
//! (component B). The 256-entry store itself, hand-authored as the
//! routines for every RV32I_Zicsr instruction this core implements, lives
//! in [`store`].

pub mod mapping;
pub mod sequencer;
pub mod store;
pub mod word;

pub use sequencer::Conditions;
pub use word::MicroWord;
