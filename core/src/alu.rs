//! The ALU (component F): a single 32-bit unit with two latched operands
//! and a small, fixed instruction set. Everything downstream of register
//! and immediate fetch flows through here, including PC+4 and CSR
//! read/write values — there is exactly one arithmetic unit in this core.
//!
//! `AluOp`/`AluIMod`/`AluOMod` are owned by [`crate::microcode::word`] (a
//! microcode word's fields are the canonical definition); this module only
//! consumes them.

use crate::microcode::word::{AluIMod, AluOMod, AluOp};

/// Computes one ALU result. This is the single function exercised by every
/// micro-instruction that asserts an `alu_op`; there is no other compute
/// path through the datapath.
pub fn compute(op: AluOp, i_mod: AluIMod, o_mod: AluOMod, a: u32, b: u32) -> u32 {
    let (a, b) = match i_mod {
        AluIMod::None => (a, b),
        AluIMod::InvertMsb => (a ^ 0x8000_0000, b ^ 0x8000_0000),
    };

    let raw = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Sll1 => a.wrapping_shl(1),
        AluOp::Srl1 => a >> 1,
        AluOp::Sra1 => ((a as i32) >> 1) as u32,
        AluOp::Sltu => (a < b) as u32,
    };

    match o_mod {
        AluOMod::None => raw,
        AluOMod::InvertLsb => raw ^ 1,
        AluOMod::ClearLsb => raw & !1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_wraps() {
        assert_eq!(compute(AluOp::Add, AluIMod::None, AluOMod::None, u32::MAX, 1), 0);
    }

    #[test]
    fn sltu_basic() {
        assert_eq!(compute(AluOp::Sltu, AluIMod::None, AluOMod::None, 1, 2), 1);
        assert_eq!(compute(AluOp::Sltu, AluIMod::None, AluOMod::None, 2, 1), 0);
    }

    #[test]
    fn slt_via_invert_msb() {
        // -1 (0xFFFFFFFF) < 1 signed, but not unsigned.
        let a = u32::MAX;
        let b = 1u32;
        assert_eq!(compute(AluOp::Sltu, AluIMod::None, AluOMod::None, a, b), 0);
        assert_eq!(compute(AluOp::Sltu, AluIMod::InvertMsb, AluOMod::None, a, b), 1);
    }

    #[test]
    fn sgeu_via_invert_lsb() {
        assert_eq!(compute(AluOp::Sltu, AluIMod::None, AluOMod::InvertLsb, 2, 1), 1);
        assert_eq!(compute(AluOp::Sltu, AluIMod::None, AluOMod::InvertLsb, 1, 2), 0);
    }

    #[test]
    fn clear_lsb_forces_even() {
        assert_eq!(
            compute(AluOp::Add, AluIMod::None, AluOMod::ClearLsb, 3, 2),
            4
        );
    }

    #[test]
    fn sra_preserves_sign() {
        let a = 0x8000_0000u32;
        assert_eq!(compute(AluOp::Sra1, AluIMod::None, AluOMod::None, a, 0), 0xC000_0000);
    }
}
