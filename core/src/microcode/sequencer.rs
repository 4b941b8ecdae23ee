//! Sequencer (component B): computes the next micro-PC from the current
//! word, the condition mux outputs, and (for `jmp_type = map`) the mapping
//! table's result.

use super::word::{CondTest, JumpType, MicroWord};
use crate::decode::Decoded;
use crate::microcode::mapping::{self, EntryTable};

/// All condition-mux outputs (component C), valid for the current tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Conditions {
    pub exception: bool,
    pub alu_zero: bool,
    pub alu_low5_zero: bool,
    pub mem_valid: bool,
}

fn test(word: &MicroWord, cond: &Conditions) -> bool {
    let raw = match word.cond_test {
        CondTest::Exception => cond.exception,
        CondTest::AluZero => cond.alu_zero,
        CondTest::AluLow5Zero => cond.alu_low5_zero,
        CondTest::MemValid => cond.mem_valid,
        CondTest::True => true,
    };
    raw ^ word.invert_test
}

/// Computes `next_upc` for `word` at `upc`, given this tick's condition
/// outputs and decoded instruction (consulted only for `jmp_type = map`).
pub fn next_upc(
    word: &MicroWord,
    upc: u8,
    cond: &Conditions,
    decoded: &Decoded,
    entries: &EntryTable,
) -> u8 {
    let taken = test(word, cond);
    match word.jmp_type {
        JumpType::Cont => upc.wrapping_add(1),
        JumpType::Direct => {
            if taken {
                word.target
            } else {
                upc.wrapping_add(1)
            }
        }
        JumpType::DirectZero => {
            if taken {
                word.target
            } else {
                0
            }
        }
        JumpType::Map => {
            if taken {
                word.target
            } else {
                mapping::map(entries, decoded)
            }
        }
    }
}
