//! The 256-entry microcode store itself (component A): one routine per
//! RV32I_Zicsr instruction shape, hand-authored as Rust rather than
//! assembled from any textual microcode language.
//!
//! Addresses are assigned by [`Emitter`], a bump allocator: each routine
//! calls [`Emitter::emit`] for every word it needs and gets back the
//! micro-PC it landed at, so inserting or lengthening a routine never
//! requires renumbering anything after it. [`build`] drives every routine
//! in turn and hands back both the finished word array and the
//! [`EntryTable`] the mapping table dispatches through.

use crate::error::BuildError;
use crate::microcode::mapping::EntryTable;
use crate::microcode::word::*;

const STORE_LEN: usize = 256;

struct Emitter {
    words: Vec<MicroWord>,
}

impl Emitter {
    fn new() -> Self {
        Self { words: Vec::with_capacity(STORE_LEN) }
    }

    /// Appends `word` and returns the micro-PC it was assigned.
    fn emit(&mut self, word: MicroWord) -> u8 {
        let addr = self.words.len();
        assert!(addr < STORE_LEN, "microcode store overflow at {addr}");
        self.words.push(word);
        addr as u8
    }

    /// Reserves `n` addresses, to be filled in later via [`Emitter::fill`].
    /// Used by routines that need to jump forward to a tail emitted by a
    /// different routine before that tail's address is known.
    fn reserve(&mut self, n: usize) -> u8 {
        let addr = self.words.len();
        assert!(addr + n <= STORE_LEN, "microcode store overflow at {addr}");
        for _ in 0..n {
            self.words.push(PANIC);
        }
        addr as u8
    }

    fn fill(&mut self, addr: u8, word: MicroWord) {
        self.words[addr as usize] = word;
    }
}

fn jump(target: u8) -> MicroWord {
    MicroWord { jmp_type: JumpType::Direct, cond_test: CondTest::True, invert_test: false, target, ..NOP }
}

fn to_fetch() -> MicroWord {
    MicroWord { pc_action: PcAction::Inc, ..jump(0) }
}

/// Builds the complete microcode store and its entry table.
///
/// Infallible in practice (every routine below emits a fixed, bounded
/// number of words well under the 256-entry ceiling); the `Result` exists
/// so a future routine addition that overflows the store fails loudly via
/// [`BuildError`] instead of panicking deep in [`Emitter::emit`].
pub fn build() -> Result<([MicroWord; STORE_LEN], EntryTable), BuildError> {
    let mut e = Emitter::new();

    // --- Fetch / dispatch prologue --------------------------------------
    //
    // upc 0: repeatedly present a fetch request at `pc` until the bus
    // acks, then fall through to dispatch. `insn_fetch` tells `Core::tick`
    // to decode the ack'd word into the decoder latch before the next
    // tick uses it.
    let fetch = e.emit(MicroWord {
        mem_req: true,
        insn_fetch: true,
        cond_test: CondTest::MemValid,
        invert_test: true,
        jmp_type: JumpType::Direct,
        target: 0,
        ..NOP
    });
    debug_assert_eq!(fetch, 0, "fetch must live at the reset vector, micro-PC 0");

    // Trap entry is referenced by name from every routine's exception
    // exit, so it is built first and its address captured once.
    let trap_entry = build_trap_entry(&mut e);

    // upc 1 (implicitly): dispatch. Eagerly reads rs1 (cheap: every
    // instruction shape either needs it or ignores a harmless read of
    // x0..x31 into the A latch) while testing for a dispatch-time
    // exception (illegal instruction, EBREAK, ECALL, or a pending
    // external interrupt, in that priority order — see `Core::tick`).
    let dispatch = e.emit(MicroWord {
        reg_read: true,
        reg_r_sel: RegRSel::InsnRs1,
        latch_a: true,
        a_src: ASrc::Gp,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Map,
        target: trap_entry,
        except_ctl: ExceptCtl::LatchDecoderCause,
        ..NOP
    });
    debug_assert_eq!(dispatch, fetch + 1);

    let branch_taken_tail = build_branch_taken_tail(&mut e, trap_entry);

    let load = build_load(&mut e, trap_entry);
    let store = build_store(&mut e, trap_entry);
    let misc_mem = build_misc_mem(&mut e);
    let (op_imm, op) = build_op_imm_and_op(&mut e);
    let auipc = build_auipc(&mut e);
    let lui = build_lui(&mut e);
    let jal = build_jal(&mut e, trap_entry);
    let jalr = build_jalr(&mut e, trap_entry);
    let branch = build_branch(&mut e, branch_taken_tail);
    let csr = build_csr(&mut e, trap_entry);
    let mret = build_mret(&mut e);
    let panic = e.emit(PANIC);

    let entries = EntryTable {
        load,
        store,
        misc_mem,
        op_imm,
        op,
        branch,
        jalr,
        jal,
        auipc,
        lui,
        csr,
        mret,
        trap_entry,
        panic,
    };

    while e.words.len() < STORE_LEN {
        e.words.push(PANIC);
    }

    let words: [MicroWord; STORE_LEN] = e
        .words
        .try_into()
        .unwrap_or_else(|v: Vec<MicroWord>| panic!("store length {} != {STORE_LEN}", v.len()));

    for addr in [
        entries.misc_mem,
        entries.jalr,
        entries.jal,
        entries.auipc,
        entries.lui,
        entries.mret,
        entries.trap_entry,
        entries.panic,
    ] {
        if addr as usize >= STORE_LEN {
            return Err(BuildError::AddressOutOfRange(addr as u16));
        }
    }

    // Same defensive check as above, extended to the per-funct3/funct7
    // mapping tables: every entry is a micro-PC some dispatched
    // instruction will jump straight to, so it owes the same bounds
    // guarantee a scalar entry point does.
    for (opcode, targets) in [
        (0u8, &entries.load[..]),
        (1, &entries.store[..]),
        (2, &entries.op_imm[..]),
        (3, &entries.op[..]),
        (4, &entries.branch[..]),
        (5, &entries.csr[..]),
    ] {
        for &target in targets {
            if target as usize >= STORE_LEN {
                return Err(BuildError::MapTargetOutOfRange(opcode, target));
            }
        }
    }

    Ok((words, entries))
}

/// §4.K: trap entry, shared by illegal-instruction/EBREAK/ECALL/external
/// IRQ and by every in-routine address-exception check. Saves `mepc`,
/// `mcause` was already latched by whichever `ExceptCtl` check branched
/// here; swaps MIE into MPIE and clears MIE; jumps to `mtvec`.
fn build_trap_entry(e: &mut Emitter) -> u8 {
    e.emit(MicroWord {
        except_ctl: ExceptCtl::EnterTrap,
        jmp_type: JumpType::Direct,
        cond_test: CondTest::True,
        target: 0,
        ..NOP
    })
}

/// Shared tail for a taken branch: computes `pc + imm` (staged into the
/// A/B latches as `(imm, pc)` by whichever dispatch tick jumps here),
/// checks the target's alignment, then commits it to `pc`.
fn build_branch_taken_tail(e: &mut Emitter, trap_entry: u8) -> u8 {
    let check = e.emit(MicroWord {
        alu_op: AluOp::Add,
        except_ctl: ExceptCtl::LatchJumpTargetCause,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Direct,
        target: trap_entry,
        ..NOP
    });
    e.emit(MicroWord { pc_action: PcAction::LoadAluO, ..to_fetch() });
    check
}

fn build_load(e: &mut Emitter, trap_entry: u8) -> [u8; 8] {
    let entry = e.emit(MicroWord { latch_b: true, b_src: BSrc::Imm, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        latch_adr: true,
        latch_a: true,
        a_src: ASrc::Zero,
        except_ctl: ExceptCtl::LatchLoadAddressCause,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Direct,
        target: trap_entry,
        ..NOP
    });
    let wait = e.emit(MicroWord {
        mem_req: true,
        mem_sel: MemSel::Auto,
        latch_b: true,
        b_src: BSrc::DatR,
        cond_test: CondTest::MemValid,
        invert_test: true,
        jmp_type: JumpType::Direct,
        target: 0xFF,
        ..NOP
    });
    e.fill(wait, MicroWord { target: wait, ..e_word(e, wait) });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        reg_write: true,
        reg_w_sel: RegWSel::InsnRd,
        ..to_fetch()
    });
    // All five implemented LOAD widths (LB/LH/LW/LBU/LHU) share one
    // routine; `mem_sel = Auto` derives width and sign extension from
    // the decoder latch's `funct3` at run time (`Core::tick`), so the
    // microcode itself need not branch on it.
    [entry, entry, entry, 0xFF, entry, entry, 0xFF, 0xFF]
}

fn build_store(e: &mut Emitter, trap_entry: u8) -> [u8; 8] {
    let entry = e.emit(MicroWord { latch_b: true, b_src: BSrc::Imm, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        latch_adr: true,
        reg_read: true,
        reg_r_sel: RegRSel::InsnRs2,
        latch_b: true,
        b_src: BSrc::Gp,
        latch_a: true,
        a_src: ASrc::Zero,
        except_ctl: ExceptCtl::LatchStoreAddressCause,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Direct,
        target: trap_entry,
        ..NOP
    });
    let wait = e.emit(MicroWord {
        alu_op: AluOp::Add,
        mem_req: true,
        write_mem: true,
        mem_sel: MemSel::Auto,
        cond_test: CondTest::MemValid,
        invert_test: true,
        jmp_type: JumpType::Direct,
        target: 0xFF,
        ..NOP
    });
    e.fill(wait, MicroWord { target: wait, ..e_word(e, wait) });
    e.emit(to_fetch());
    [entry, entry, entry, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
}

fn build_misc_mem(e: &mut Emitter) -> u8 {
    // FENCE: this core has a single in-order hart and no caches or
    // store buffering, so every fence is a no-op other than retiring.
    e.emit(to_fetch())
}

/// Builds OP-IMM and OP together: both register-register and
/// register-immediate arithmetic share the same ALU op selection and,
/// for the shift forms, the same shift loop body.
fn build_op_imm_and_op(e: &mut Emitter) -> ([u8; 16], [u8; 16]) {
    let mut op_imm = [0xFFu8; 16];
    let mut op = [0xFFu8; 16];

    // Non-shift OP-IMM forms: ADDI, SLTI, SLTIU, XORI, ORI, ANDI.
    // Two ticks: stage B <- imm, then compute + commit + refetch.
    let imm_arith = |e: &mut Emitter, alu_op, i_mod| -> u8 {
        let entry = e.emit(MicroWord { latch_b: true, b_src: BSrc::Imm, ..NOP });
        e.emit(MicroWord {
            alu_op,
            alu_i_mod: i_mod,
            reg_write: true,
            reg_w_sel: RegWSel::InsnRd,
            ..to_fetch()
        });
        entry
    };
    op_imm[0b000] = imm_arith(e, AluOp::Add, AluIMod::None); // ADDI
    op_imm[0b010] = imm_arith(e, AluOp::Sltu, AluIMod::InvertMsb); // SLTI
    op_imm[0b011] = imm_arith(e, AluOp::Sltu, AluIMod::None); // SLTIU
    op_imm[0b100] = imm_arith(e, AluOp::Xor, AluIMod::None); // XORI
    op_imm[0b110] = imm_arith(e, AluOp::Or, AluIMod::None); // ORI
    op_imm[0b111] = imm_arith(e, AluOp::And, AluIMod::None); // ANDI

    // Non-shift OP forms: ADD, SUB, SLT, SLTU, XOR, OR, AND.
    // Three ticks: read rs2 -> B, compute + commit + refetch.
    let reg_arith = |e: &mut Emitter, alu_op, i_mod| -> u8 {
        let entry = e.emit(MicroWord {
            reg_read: true,
            reg_r_sel: RegRSel::InsnRs2,
            latch_b: true,
            b_src: BSrc::Gp,
            ..NOP
        });
        e.emit(MicroWord {
            alu_op,
            alu_i_mod: i_mod,
            reg_write: true,
            reg_w_sel: RegWSel::InsnRd,
            ..to_fetch()
        });
        entry
    };
    op[0b000] = reg_arith(e, AluOp::Add, AluIMod::None); // ADD
    op[0b000 + 8] = reg_arith(e, AluOp::Sub, AluIMod::None); // SUB
    op[0b010] = reg_arith(e, AluOp::Sltu, AluIMod::InvertMsb); // SLT
    op[0b011] = reg_arith(e, AluOp::Sltu, AluIMod::None); // SLTU
    op[0b100] = reg_arith(e, AluOp::Xor, AluIMod::None); // XOR
    op[0b110] = reg_arith(e, AluOp::Or, AluIMod::None); // OR
    op[0b111] = reg_arith(e, AluOp::And, AluIMod::None); // AND

    // Shift loop bodies, one per direction, shared by the immediate and
    // register forms alike (§4.F addition: a dedicated down-counter
    // latch, since this ALU only ever shifts by one bit per tick).
    let shift_loop = |e: &mut Emitter, alu_op: AluOp| -> (u8, u8) {
        let test = e.reserve(1);
        let body = e.emit(MicroWord {
            dec_shift_count: true,
            alu_op,
            a_src: ASrc::AluO,
            latch_a: true,
            jmp_type: JumpType::Direct,
            cond_test: CondTest::True,
            invert_test: false,
            target: test,
            ..NOP
        });
        let exit = e.emit(MicroWord {
            reg_write: true,
            reg_w_sel: RegWSel::InsnRd,
            ..to_fetch()
        });
        e.fill(
            test,
            MicroWord {
                cond_test: CondTest::AluLow5Zero,
                invert_test: false,
                jmp_type: JumpType::Direct,
                target: exit,
                ..NOP
            },
        );
        (test, body)
    };
    let (sll_test, _) = shift_loop(e, AluOp::Sll1);
    let (srl_test, _) = shift_loop(e, AluOp::Srl1);
    let (sra_test, _) = shift_loop(e, AluOp::Sra1);

    // Immediate-form shift entries: A <- 0, B <- shift amount; then
    // A <- rs1 while the shift amount is folded into the counter latch;
    // then into the shared loop.
    let imm_shift = |e: &mut Emitter, loop_test: u8| -> u8 {
        let entry = e.emit(MicroWord { latch_a: true, a_src: ASrc::Zero, latch_b: true, b_src: BSrc::Imm, ..NOP });
        e.emit(MicroWord {
            alu_op: AluOp::Add,
            load_shift_count: true,
            reg_read: true,
            reg_r_sel: RegRSel::InsnRs1,
            latch_a: true,
            a_src: ASrc::Gp,
            // B has served its only purpose (staging the shift amount for
            // load_shift_count's alu_result above); clear it here so the
            // loop's shared exit word's `Add` passthrough reads the
            // accumulator back out unchanged instead of adding stale B.
            latch_b: true,
            b_src: BSrc::Zero,
            jmp_type: JumpType::Direct,
            cond_test: CondTest::True,
            invert_test: false,
            target: loop_test,
            ..NOP
        });
        entry
    };
    op_imm[0b001] = imm_shift(e, sll_test); // SLLI
    op_imm[0b101] = imm_shift(e, srl_test); // SRLI
    op_imm[0b101 + 8] = imm_shift(e, sra_test); // SRAI

    // Register-form shift entries: same shape, but the shift amount
    // comes from rs2 rather than the immediate.
    let reg_shift = |e: &mut Emitter, loop_test: u8| -> u8 {
        let entry = e.emit(MicroWord {
            latch_a: true,
            a_src: ASrc::Zero,
            reg_read: true,
            reg_r_sel: RegRSel::InsnRs2,
            latch_b: true,
            b_src: BSrc::Gp,
            ..NOP
        });
        e.emit(MicroWord {
            alu_op: AluOp::Add,
            load_shift_count: true,
            reg_read: true,
            reg_r_sel: RegRSel::InsnRs1,
            latch_a: true,
            a_src: ASrc::Gp,
            // Same reasoning as the immediate form: B held the shift
            // amount only so load_shift_count could read it above.
            latch_b: true,
            b_src: BSrc::Zero,
            jmp_type: JumpType::Direct,
            cond_test: CondTest::True,
            invert_test: false,
            target: loop_test,
            ..NOP
        });
        entry
    };
    op[0b001] = reg_shift(e, sll_test); // SLL
    op[0b101] = reg_shift(e, srl_test); // SRL
    op[0b101 + 8] = reg_shift(e, sra_test); // SRA

    (op_imm, op)
}

fn build_auipc(e: &mut Emitter) -> u8 {
    let entry = e.emit(MicroWord { latch_a: true, a_src: ASrc::Imm, latch_b: true, b_src: BSrc::Pc, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        reg_write: true,
        reg_w_sel: RegWSel::InsnRd,
        ..to_fetch()
    });
    entry
}

fn build_lui(e: &mut Emitter) -> u8 {
    let entry = e.emit(MicroWord { latch_a: true, a_src: ASrc::Zero, latch_b: true, b_src: BSrc::Imm, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        reg_write: true,
        reg_w_sel: RegWSel::InsnRd,
        ..to_fetch()
    });
    entry
}

fn build_jal(e: &mut Emitter, trap_entry: u8) -> u8 {
    // rd <- pc + 4 first (A <- 4, B <- pc), committed without consuming
    // the register read port (rd is a write, not a read).
    let entry = e.emit(MicroWord { latch_a: true, a_src: ASrc::Four, latch_b: true, b_src: BSrc::Pc, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        reg_write: true,
        reg_w_sel: RegWSel::InsnRd,
        latch_a: true,
        a_src: ASrc::Imm,
        latch_b: true,
        b_src: BSrc::Pc,
        ..NOP
    });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        except_ctl: ExceptCtl::LatchJumpTargetCause,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Direct,
        target: trap_entry,
        ..NOP
    });
    e.emit(MicroWord { pc_action: PcAction::LoadAluO, ..to_fetch() });
    entry
}

fn build_jalr(e: &mut Emitter, trap_entry: u8) -> u8 {
    let entry = e.emit(MicroWord { latch_a: true, a_src: ASrc::Four, latch_b: true, b_src: BSrc::Pc, ..NOP });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        reg_write: true,
        reg_w_sel: RegWSel::InsnRd,
        reg_read: true,
        reg_r_sel: RegRSel::InsnRs1,
        latch_a: true,
        a_src: ASrc::Gp,
        latch_b: true,
        b_src: BSrc::Imm,
        ..NOP
    });
    e.emit(MicroWord {
        alu_op: AluOp::Add,
        alu_o_mod: AluOMod::ClearLsb,
        except_ctl: ExceptCtl::LatchJumpTargetCause,
        cond_test: CondTest::Exception,
        invert_test: false,
        jmp_type: JumpType::Direct,
        target: trap_entry,
        ..NOP
    });
    e.emit(MicroWord { alu_o_mod: AluOMod::ClearLsb, pc_action: PcAction::LoadAluO, ..to_fetch() });
    entry
}

fn build_branch(e: &mut Emitter, taken_tail: u8) -> [u8; 8] {
    let mut branch = [0xFFu8; 8];
    // Every comparison reduces to an ALU op whose result is exactly 0 or
    // 1, tested for zero/nonzero — see the routine-level reasoning this
    // module's doc comment summarizes. BEQ is the sole "taken on zero"
    // case; every other implemented comparison is "taken on nonzero".
    let cmp = |e: &mut Emitter,
               alu_op: AluOp,
               i_mod: AluIMod,
               o_mod: AluOMod,
               invert_test: bool|
     -> u8 {
        let entry = e.emit(MicroWord {
            reg_read: true,
            reg_r_sel: RegRSel::InsnRs2,
            latch_b: true,
            b_src: BSrc::Gp,
            ..NOP
        });
        e.emit(MicroWord {
            alu_op,
            alu_i_mod: i_mod,
            alu_o_mod: o_mod,
            cond_test: CondTest::AluZero,
            invert_test,
            jmp_type: JumpType::Direct,
            target: taken_tail,
            latch_a: true,
            a_src: ASrc::Imm,
            latch_b: true,
            b_src: BSrc::Pc,
            ..NOP
        });
        e.emit(to_fetch());
        entry
    };
    branch[0b000] = cmp(e, AluOp::Sub, AluIMod::None, AluOMod::None, false); // BEQ
    branch[0b001] = cmp(e, AluOp::Sub, AluIMod::None, AluOMod::None, true); // BNE
    branch[0b100] = cmp(e, AluOp::Sltu, AluIMod::InvertMsb, AluOMod::None, true); // BLT
    branch[0b101] = cmp(e, AluOp::Sltu, AluIMod::InvertMsb, AluOMod::InvertLsb, true); // BGE
    branch[0b110] = cmp(e, AluOp::Sltu, AluIMod::None, AluOMod::None, true); // BLTU
    branch[0b111] = cmp(e, AluOp::Sltu, AluIMod::None, AluOMod::InvertLsb, true); // BGEU
    branch
}

/// Builds the six CSR read-modify-write forms plus MRET.
///
/// All six forms share the "double-XOR" extraction trick to recover the
/// write operand cleanly once both it and the old CSR value are parked
/// in the A/B latches: with `x = a XOR b`, writing `x` back into `a`
/// leaves `x XOR b` equal to the *original* `a`. Since `BSrc` has no
/// literal-zero source (only `ASrc::Zero` does), this is how a CSR
/// routine isolates "the old value alone" or "the operand alone" for a
/// clean write without ever being able to zero the B latch directly.
fn build_csr(e: &mut Emitter, trap_entry: u8) -> [u8; 8] {
    let mut csr = [0xFFu8; 8];

    // funct3: 001 CSRRW, 010 CSRRS, 011 CSRRC, 101 CSRRWI, 110 CSRRSI, 111 CSRRCI.
    // `op` selects how the new value is formed from (old, operand):
    //   Write -> operand directly; Read (reused here as "RMW") -> apply
    //   Or/And-not per `funct3` bit 1 (set vs clear), computed by the
    //   caller before emitting.
    enum Form {
        Write,
        Set,
        Clear,
    }

    let build_form = |e: &mut Emitter, form: Form, immediate: bool| -> u8 {
        // Stage A <- 0 and B <- the raw operand (either the zero-extended
        // 5-bit rs1 specifier treated as an immediate, or rs1 itself) so
        // the next tick can fold it into A as a clean pass-through
        // (0 + operand), regardless of whatever B held beforehand.
        let entry = e.emit(if immediate {
            MicroWord { latch_a: true, a_src: ASrc::Zero, latch_b: true, b_src: BSrc::CsrImm, ..NOP }
        } else {
            MicroWord {
                latch_a: true,
                a_src: ASrc::Zero,
                reg_read: true,
                reg_r_sel: RegRSel::InsnRs1,
                latch_b: true,
                b_src: BSrc::Gp,
                ..NOP
            }
        });
        // Fold the staged operand into A alone (A <- 0 + operand) and
        // bring in the old CSR value as B, ready for the legality check
        // and the double-XOR extraction that follows.
        e.emit(MicroWord {
            alu_op: AluOp::Add,
            a_src: ASrc::AluO,
            latch_a: true,
            latch_b: true,
            b_src: BSrc::Csr,
            ..NOP
        });
        // CSR-specific legality: requires the operand (A) to determine
        // whether a CSRRS/CSRRC(I) with an all-zero mask counts as a
        // write at all (§4.J). CSRRW(I) always writes.
        e.emit(MicroWord {
            except_ctl: ExceptCtl::LatchCsrCause,
            cond_test: CondTest::Exception,
            invert_test: false,
            jmp_type: JumpType::Direct,
            target: trap_entry,
            ..NOP
        });
        // `A <- operand XOR old`, `B` still holds `old` untouched. This is
        // the first half of the swap-extract; what each form does with it
        // differs only in how it gets back to a clean `operand` value.
        e.emit(MicroWord { alu_op: AluOp::Xor, a_src: ASrc::AluO, latch_a: true, ..NOP });
        // Commit tick's `alu_op` is chosen so this tick's combinational
        // result is exactly the new CSR value, given whatever (A, B) the
        // form-specific setup above left behind.
        let commit_op = match form {
            Form::Write => {
                // A = operand XOR old already; XOR with B (old) recovers
                // operand itself, which is the new value outright.
                AluOp::Xor
            }
            Form::Set => {
                // Recover operand into A first (A XOR B again), then the
                // commit tick ORs it against old (B) for `old | operand`.
                e.emit(MicroWord { alu_op: AluOp::Xor, a_src: ASrc::AluO, latch_a: true, ..NOP });
                AluOp::Or
            }
            Form::Clear => {
                // `new = old AND NOT operand = old XOR (old AND operand)`.
                // Recover operand, AND it with old into A, then the
                // commit tick XORs that against old (B) for the result.
                e.emit(MicroWord { alu_op: AluOp::Xor, a_src: ASrc::AluO, latch_a: true, ..NOP });
                e.emit(MicroWord { alu_op: AluOp::And, a_src: ASrc::AluO, latch_a: true, ..NOP });
                AluOp::Xor
            }
        };
        // Commit: write the freshly computed new value to the CSR. `B`
        // (old) is left untouched throughout, so it is still available,
        // unmolested, for the writeback tick below.
        e.emit(MicroWord { alu_op: commit_op, csr_op: CsrOp::Write, csr_sel: CsrSel::Insn, ..NOP });
        // A <- 0, so the final tick can pass `B` (old) through the ALU
        // cleanly to `rd` without any of `A`'s leftover staging value
        // contaminating it.
        e.emit(MicroWord { latch_a: true, a_src: ASrc::Zero, ..NOP });
        e.emit(MicroWord {
            alu_op: AluOp::Add,
            reg_write: true,
            reg_w_sel: RegWSel::InsnRd,
            ..to_fetch()
        });
        entry
    };

    csr[0b001] = build_form(e, Form::Write, false); // CSRRW
    csr[0b010] = build_form(e, Form::Set, false); // CSRRS
    csr[0b011] = build_form(e, Form::Clear, false); // CSRRC
    csr[0b101] = build_form(e, Form::Write, true); // CSRRWI
    csr[0b110] = build_form(e, Form::Set, true); // CSRRSI
    csr[0b111] = build_form(e, Form::Clear, true); // CSRRCI
    csr
}

fn build_mret(e: &mut Emitter) -> u8 {
    e.emit(MicroWord { except_ctl: ExceptCtl::LeaveTrap, ..to_fetch() })
}

/// Reads back the word at `addr`, used only to extend an already-emitted
/// wait-loop word with its own address as `target` (the emitter cannot
/// know its future address at the point the word is first constructed).
fn e_word(e: &Emitter, addr: u8) -> MicroWord {
    e.words[addr as usize]
}
