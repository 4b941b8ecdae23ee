//! The horizontal microcode word (§3) and every field enumeration it is
//! built from. Each enum is a small `Copy` value; a [`MicroWord`] is a
//! plain struct of them, never a trait object, so the whole 256-entry
//! store lives as one `'static` array with no indirection.

/// How the sequencer (component B) selects `next_upc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpType {
    /// `upc + 1`, unconditionally.
    Cont,
    /// Conditional jump to `target`, else the mapping table's result.
    Map,
    /// Conditional jump to `target`, else `upc + 1`.
    Direct,
    /// Conditional jump to `target`, else micro-PC 0 (the reset/fetch
    /// vector).
    DirectZero,
}

/// Condition tested by the sequencer, combined with `invert_test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondTest {
    Exception,
    AluZero,
    /// Low 5 bits of the ALU output are zero; used to end shift loops.
    AluLow5Zero,
    MemValid,
    True,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcAction {
    Hold,
    Inc,
    LoadAluO,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ASrc {
    Gp,
    Imm,
    AluO,
    Zero,
    Four,
    ThirtyOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BSrc {
    Gp,
    Pc,
    Imm,
    One,
    /// Literal zero, the `B`-latch counterpart to `ASrc::Zero`. Used to
    /// retire a stale `B` value once it has served its purpose (e.g. a
    /// shift routine clearing the shift-amount operand out of `B` before
    /// its result-passthrough tick, so a later `alu_op = Add` reads the
    /// accumulator in `A` back out unchanged).
    Zero,
    DatR,
    CsrImm,
    Csr,
    McauseLatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Sll1,
    Srl1,
    Sra1,
    Sltu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluIMod {
    None,
    InvertMsb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOMod {
    None,
    InvertLsb,
    ClearLsb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRSel {
    InsnRs1,
    InsnRs2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegWSel {
    InsnRd,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrOp {
    None,
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrSel {
    /// CSR number comes from the decoded instruction's `imm[31:20]` field.
    Insn,
    /// CSR number is a microcode-time constant (used by trap entry to
    /// address `mtvec`/`mepc`/`mcause` without a decoded instruction).
    MicrocodeTarget(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemSel {
    Auto,
    Byte,
    Halfword,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemExtend {
    Zero,
    Sign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptCtl {
    None,
    LatchDecoderCause,
    /// CSR-specific illegal-access check (§4.J): consulted once the write
    /// mask (the set/clear operand, parked in the A latch by convention)
    /// is actually available, which is always a tick or more after the
    /// generic `LatchDecoderCause` dispatch check — kept as its own
    /// variant so the two checks can never fire against each other's
    /// stale latch contents.
    LatchCsrCause,
    LatchJumpTargetCause,
    LatchLoadAddressCause,
    LatchStoreAddressCause,
    EnterTrap,
    LeaveTrap,
}

/// One 256th of the microcode store.
#[derive(Debug, Clone, Copy)]
pub struct MicroWord {
    pub target: u8,
    pub jmp_type: JumpType,
    pub cond_test: CondTest,
    pub invert_test: bool,

    pub pc_action: PcAction,

    pub latch_a: bool,
    pub a_src: ASrc,
    pub latch_b: bool,
    pub b_src: BSrc,

    pub alu_op: AluOp,
    pub alu_i_mod: AluIMod,
    pub alu_o_mod: AluOMod,

    pub reg_read: bool,
    pub reg_write: bool,
    pub reg_r_sel: RegRSel,
    pub reg_w_sel: RegWSel,

    pub csr_op: CsrOp,
    pub csr_sel: CsrSel,

    pub mem_req: bool,
    pub write_mem: bool,
    pub insn_fetch: bool,
    pub mem_sel: MemSel,
    pub mem_extend: MemExtend,

    pub latch_adr: bool,
    pub latch_data: bool,

    /// Decrements the shift-loop counter latch this tick (§4.F addition).
    pub dec_shift_count: bool,
    /// Loads the shift-loop counter latch from the ALU output this tick.
    pub load_shift_count: bool,

    pub except_ctl: ExceptCtl,
}

/// The all-"do nothing, fall through" word; every field set to its most
/// inert variant. Microcode routines are written as struct-update literals
/// against this base, the way the teacher builds its control words off a
/// `default()`-like base.
pub const NOP: MicroWord = MicroWord {
    target: 0,
    jmp_type: JumpType::Cont,
    cond_test: CondTest::True,
    invert_test: false,
    pc_action: PcAction::Hold,
    latch_a: false,
    a_src: ASrc::Gp,
    latch_b: false,
    b_src: BSrc::Gp,
    alu_op: AluOp::Add,
    alu_i_mod: AluIMod::None,
    alu_o_mod: AluOMod::None,
    reg_read: false,
    reg_write: false,
    reg_r_sel: RegRSel::InsnRs1,
    reg_w_sel: RegWSel::InsnRd,
    csr_op: CsrOp::None,
    csr_sel: CsrSel::Insn,
    mem_req: false,
    write_mem: false,
    insn_fetch: false,
    mem_sel: MemSel::Auto,
    mem_extend: MemExtend::Zero,
    latch_adr: false,
    latch_data: false,
    dec_shift_count: false,
    load_shift_count: false,
    except_ctl: ExceptCtl::None,
};

/// The panic word every unassigned slot in the 256-entry store defaults
/// to (§4.A addition): an unconditional self-loop, never a host panic.
pub const PANIC: MicroWord = MicroWord {
    jmp_type: JumpType::DirectZero,
    cond_test: CondTest::True,
    invert_test: true,
    target: 0xFF,
    ..NOP
};
