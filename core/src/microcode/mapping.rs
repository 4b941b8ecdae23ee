//! Mapping table (component E): a pure function from the decoded
//! instruction's opcode/funct3/funct7 bits to the 8-bit micro-PC where its
//! routine begins (§4.E).
//!
//! Addition: rather than pinning the 256-entry store's layout to hand-
//! picked addresses (fragile — any routine that grows by one tick shifts
//! every address after it), the entry points are resolved once, at store
//! build time, into an [`EntryTable`], and this module's [`map`] is a pure
//! function of that table plus the decoded instruction. This plays the
//! role of a linker resolving labels; it is not a microcode assembler
//! (there is still no textual microcode source, and the word contents
//! themselves are still authored directly as Rust in [`crate::microcode::store`]).

use crate::decode::{Decoded, Opcode};

/// Resolved entry micro-PC for every dispatchable instruction shape.
/// Built once by [`crate::microcode::store::build`] and held alongside the
/// 256-entry word array for the lifetime of the core.
#[derive(Debug, Clone, Copy)]
pub struct EntryTable {
    /// Indexed by `funct3` (0..=7); unused slots hold the panic address.
    pub load: [u8; 8],
    pub store: [u8; 8],
    pub misc_mem: u8,
    /// Indexed by `funct3 + (8 if alternate funct7)`.
    pub op_imm: [u8; 16],
    pub op: [u8; 16],
    pub branch: [u8; 8],
    pub jalr: u8,
    pub jal: u8,
    pub auipc: u8,
    pub lui: u8,
    /// Indexed by `funct3` (1..=7); unused slots hold the panic address.
    pub csr: [u8; 8],
    pub mret: u8,
    pub trap_entry: u8,
    pub panic: u8,
}

/// Whether `funct7` selects the "alternate" member of an OP/OP-IMM-shift
/// pair (SUB vs ADD, SRA vs SRL).
fn is_alt(funct7: u8) -> bool {
    funct7 == 0b0100000
}

/// Computes the micro-PC a correctly-decoded instruction dispatches to.
/// Callers must have already checked `decoded.illegal` and CSR legality;
/// this function is only ever consulted on the non-exception path of the
/// dispatch word (§4.B, `jmp_type = map`).
pub fn map(entries: &EntryTable, decoded: &Decoded) -> u8 {
    match decoded.opcode {
        Opcode::Load => entries.load[decoded.funct3 as usize],
        Opcode::MiscMem => entries.misc_mem,
        Opcode::OpImm => {
            let alt = matches!(decoded.funct3, 0b001 | 0b101) && is_alt(decoded.funct7);
            entries.op_imm[decoded.funct3 as usize + if alt { 8 } else { 0 }]
        }
        Opcode::AuiPc => entries.auipc,
        Opcode::Lui => entries.lui,
        Opcode::Store => entries.store[decoded.funct3 as usize],
        Opcode::Op => entries.op[decoded.funct3 as usize + if is_alt(decoded.funct7) { 8 } else { 0 }],
        Opcode::Branch => entries.branch[decoded.funct3 as usize],
        Opcode::Jalr => entries.jalr,
        Opcode::Jal => entries.jal,
        Opcode::System => {
            if decoded.is_ecall || decoded.is_ebreak {
                entries.trap_entry
            } else if decoded.is_mret {
                entries.mret
            } else {
                entries.csr[decoded.funct3 as usize]
            }
        }
        Opcode::Reserved => entries.panic,
    }
}
