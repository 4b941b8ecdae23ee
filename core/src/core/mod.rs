//! Wires every component (registers, CSRs, decoder, ALU, microcode store,
//! sequencer, mapping table, condition mux) into the single-hart,
//! multicycle, microcoded core this crate implements (component G).
//!
//! [`Core::tick`] is the whole simulation step: one call steps the
//! horizontal microcode engine by exactly one micro-instruction, driving
//! at most one [`Bus`] transaction. It is the only place any component's
//! output actually lands in another component's input latch.

use log::trace;

use crate::alu;
use crate::bus::{Bus, Request, Response};
use crate::csr::{self, CsrFile};
use crate::decode::{self, Decoded, Opcode};
use crate::microcode::word::{
    ASrc, AluIMod, AluOMod, BSrc, CondTest, CsrOp, CsrSel, ExceptCtl, JumpType, MemExtend, MemSel,
    PcAction, RegRSel, RegWSel,
};
use crate::microcode::{store, Conditions, MicroWord};
use crate::registers::{Registers, Specifier};
use crate::rvfi::RvfiTrace;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to which the core's `pc` register is reset, and the
    /// word-address base the fetch routine first requests from.
    pub reset_vector: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { reset_vector: 0 }
    }
}

/// Micro-PC of illegal-instruction/EBREAK/ECALL/trap causes this core
/// raises. Kept as plain constants rather than an enum: `mcause` is an
/// architectural register, not a Rust type the rest of the crate branches
/// on.
mod cause {
    pub const INSTRUCTION_ADDRESS_MISALIGNED: u32 = 0;
    pub const ILLEGAL_INSTRUCTION: u32 = 2;
    pub const BREAKPOINT: u32 = 3;
    pub const LOAD_ADDRESS_MISALIGNED: u32 = 4;
    pub const STORE_ADDRESS_MISALIGNED: u32 = 6;
    pub const ENVIRONMENT_CALL_FROM_M: u32 = 11;
    pub const MACHINE_EXTERNAL_INTERRUPT: u32 = 0x8000_000B;
}

/// The multicycle microcoded RV32I_Zicsr core.
#[derive(Debug)]
pub struct Core {
    registers: Registers,
    csr: CsrFile,

    store: Box<[MicroWord; 256]>,
    entries: crate::microcode::mapping::EntryTable,
    upc: u8,

    /// The decoder output latch: holds the most recently fetched
    /// instruction's decode until the next `insn_fetch` ack overwrites it.
    decoded: Decoded,
    fetched_insn: u32,

    a_latch: u32,
    b_latch: u32,
    /// Holds a load/store effective address stable across the bus wait,
    /// decoupled from `a_latch`/`b_latch` so they stay free for staging
    /// a store's write-data value in the meantime (§4.G).
    mem_addr_latch: u32,
    /// Down-counter for the one-bit-per-tick shift loop (§4.F addition).
    shift_count: u8,

    /// Set by whichever `ExceptCtl` check last found a fault, consumed
    /// by the trap-entry routine's `EnterTrap` action a tick or more
    /// later.
    pending_cause: u32,
    /// Whether the in-flight CSR instruction's operand was nonzero at
    /// its legality-check tick — a CSRRS/CSRRC(I) with an all-zero
    /// operand does not count as a write for §4.J's read-only-CSR
    /// exemption, nor does it actually touch the CSR store.
    csr_will_write: bool,

    retire_order: u64,
    /// Set whenever a trap is entered, consumed by the next retirement's
    /// `RvfiTrace::intr` (the handler's first instruction, not the one
    /// that trapped). Also starts `true` so the very first retirement
    /// after reset is flagged the same way.
    next_intr: bool,

    /// Accumulates this in-flight instruction's RVFI register/memory/CSR
    /// signals across however many ticks it takes; reset whenever a new
    /// instruction begins dispatch (`upc == 0` on tick entry) and read
    /// out into the `RvfiTrace` at retirement.
    rvfi_rs1_rdata: u32,
    rvfi_rs2_rdata: u32,
    rvfi_mem_addr: u32,
    rvfi_mem_rmask: u8,
    rvfi_mem_wmask: u8,
    rvfi_mem_rdata: u32,
    rvfi_mem_wdata: u32,
    rvfi_csr_rmask: u32,
    rvfi_csr_wmask: u32,
    rvfi_csr_rdata: u32,
    rvfi_csr_wdata: u32,
}

impl Core {
    pub fn new(config: &Config) -> Self {
        let (store, entries) = store::build().expect("hand-authored microcode store must build");
        Self {
            registers: Registers::new(config.reset_vector),
            csr: CsrFile::new(),
            store: Box::new(store),
            entries,
            upc: 0,
            decoded: decode::decode(0x0000_0013), // NOP (ADDI x0, x0, 0)
            fetched_insn: 0,
            a_latch: 0,
            b_latch: 0,
            mem_addr_latch: 0,
            shift_count: 0,
            pending_cause: 0,
            csr_will_write: false,
            retire_order: 0,
            next_intr: true,
            rvfi_rs1_rdata: 0,
            rvfi_rs2_rdata: 0,
            rvfi_mem_addr: 0,
            rvfi_mem_rmask: 0,
            rvfi_mem_wmask: 0,
            rvfi_mem_rdata: 0,
            rvfi_mem_wdata: 0,
            rvfi_csr_rmask: 0,
            rvfi_csr_wmask: 0,
            rvfi_csr_rdata: 0,
            rvfi_csr_wdata: 0,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn csr(&self) -> &CsrFile {
        &self.csr
    }

    /// Steps the microcode engine by one micro-instruction, driving at
    /// most one bus transaction. `irq_level` is the live external
    /// interrupt line, sampled only at the dispatch micro-instruction.
    ///
    /// Returns a retirement trace whenever this tick completes an
    /// instruction (normally or via a trap); most ticks mid-routine
    /// return `None`.
    pub fn tick(&mut self, bus: &mut dyn Bus, irq_level: bool) -> Option<RvfiTrace> {
        let word = self.store[self.upc as usize];
        // This core only ever mutates `pc` on an instruction's final
        // tick, so the value on entry to *any* tick of its routine is
        // still that instruction's own address — exactly `pc_rdata`.
        let pc_rdata = self.registers.pc();

        // A new instruction begins dispatch at upc 0; start its RVFI
        // accumulators fresh rather than carrying over the previous
        // instruction's memory/CSR signals.
        if self.upc == 0 {
            self.rvfi_rs1_rdata = 0;
            self.rvfi_rs2_rdata = 0;
            self.rvfi_mem_addr = 0;
            self.rvfi_mem_rmask = 0;
            self.rvfi_mem_wmask = 0;
            self.rvfi_mem_rdata = 0;
            self.rvfi_mem_wdata = 0;
            self.rvfi_csr_rmask = 0;
            self.rvfi_csr_wmask = 0;
            self.rvfi_csr_rdata = 0;
            self.rvfi_csr_wdata = 0;
        }

        let alu_result = alu::compute(word.alu_op, word.alu_i_mod, word.alu_o_mod, self.a_latch, self.b_latch);

        let gp_read = if word.reg_read {
            let specifier = match word.reg_r_sel {
                RegRSel::InsnRs1 => self.decoded.rs1,
                RegRSel::InsnRs2 => self.decoded.rs2,
            };
            let value = self.registers.x(specifier);
            match word.reg_r_sel {
                RegRSel::InsnRs1 => self.rvfi_rs1_rdata = value,
                RegRSel::InsnRs2 => self.rvfi_rs2_rdata = value,
            }
            value
        } else {
            0
        };

        let size = mem_access_size(&self.decoded, word.mem_sel);
        let request = self.build_request(&word, alu_result, size);
        let response = bus.step(request);
        let mem_valid = response.ack;

        if word.insn_fetch && mem_valid {
            self.fetched_insn = response.read_data;
            self.decoded = decode::decode(response.read_data);
        } else if word.mem_req && mem_valid {
            self.rvfi_mem_addr = self.mem_addr_latch;
            if word.write_mem {
                self.rvfi_mem_wmask = request.sel;
                self.rvfi_mem_wdata = request.write_data;
            } else {
                self.rvfi_mem_rmask = request.sel;
                self.rvfi_mem_rdata = response.read_data;
            }
        }

        let (exception, cause) = self.evaluate_except_ctl(&word, alu_result, irq_level);
        if exception {
            self.pending_cause = cause;
        }

        let conditions = Conditions {
            exception,
            alu_zero: alu_result == 0,
            alu_low5_zero: self.shift_count == 0,
            mem_valid,
        };

        let suppress_commit = exception;

        let csr_specifier = match word.csr_sel {
            CsrSel::Insn => self.decoded.csr,
            CsrSel::MicrocodeTarget(n) => n,
        };

        // --- commits ------------------------------------------------
        if !suppress_commit {
            if word.reg_write {
                let specifier = match word.reg_w_sel {
                    RegWSel::InsnRd => self.decoded.rd,
                    RegWSel::Zero => Specifier::X0,
                };
                self.registers.set_x(specifier, alu_result);
            }
            if let CsrOp::Write = word.csr_op {
                let mask = if self.csr_will_write { u32::MAX } else { 0 };
                self.csr.write(csr_specifier, alu_result, mask);
                self.rvfi_csr_wmask = mask;
                self.rvfi_csr_wdata = alu_result;
            }
            match word.pc_action {
                PcAction::Hold => {}
                PcAction::Inc => *self.registers.pc_mut() += 4,
                PcAction::LoadAluO => *self.registers.pc_mut() = alu_result,
            }
        }

        let mut trapped = false;
        match word.except_ctl {
            ExceptCtl::EnterTrap => {
                self.csr.set_mepc(self.registers.pc());
                self.csr.set_mcause(self.pending_cause);
                self.csr.set_mpie_bit(self.csr.mie_bit());
                self.csr.set_mie_bit(false);
                *self.registers.pc_mut() = self.csr.mtvec_base();
                trapped = true;
            }
            ExceptCtl::LeaveTrap => {
                *self.registers.pc_mut() = self.csr.mepc();
                self.csr.set_mie_bit(self.csr.mpie_bit());
                self.csr.set_mpie_bit(true);
            }
            ExceptCtl::LatchCsrCause if !exception => {
                self.csr_will_write = self.csr_will_write_from(&self.decoded, self.a_latch);
            }
            _ => {}
        }

        // --- latch updates for next tick -----------------------------
        if word.latch_a {
            self.a_latch = match word.a_src {
                ASrc::Gp => gp_read,
                ASrc::Imm => self.decoded.imm as u32,
                ASrc::AluO => alu_result,
                ASrc::Zero => 0,
                ASrc::Four => 4,
                ASrc::ThirtyOne => 31,
            };
        }
        if word.latch_b {
            self.b_latch = match word.b_src {
                BSrc::Gp => gp_read,
                BSrc::Pc => self.registers.pc(),
                BSrc::Imm => self.decoded.imm as u32,
                BSrc::One => 1,
                BSrc::Zero => 0,
                BSrc::DatR => extend_load_data(response.read_data, &self.decoded, word.mem_extend, word.mem_sel, self.mem_addr_latch),
                BSrc::CsrImm => u32::from(self.decoded.rs1),
                BSrc::Csr => {
                    let value = self.csr.read(csr_specifier, irq_level);
                    self.rvfi_csr_rmask = u32::MAX;
                    self.rvfi_csr_rdata = value;
                    value
                }
                BSrc::McauseLatch => self.csr.mcause(),
            };
        }
        if word.latch_adr {
            self.mem_addr_latch = alu_result;
        }
        if word.load_shift_count {
            self.shift_count = (alu_result & 0x1F) as u8;
        }
        if word.dec_shift_count {
            self.shift_count = self.shift_count.wrapping_sub(1);
        }

        let next_upc = crate::microcode::sequencer::next_upc(&word, self.upc, &conditions, &self.decoded, &self.entries);
        let retiring = next_upc == 0 && self.upc != 0;
        self.upc = next_upc;

        if retiring {
            let order = self.retire_order;
            self.retire_order += 1;
            let intr = self.next_intr;
            self.next_intr = trapped;
            trace!(order; "retire pc_wdata={:#010x} trap={trapped}", self.registers.pc());
            Some(RvfiTrace {
                valid: true,
                order,
                insn: self.fetched_insn,
                mode: 3,
                ixl: 1,
                rs1_addr: u8::from(self.decoded.rs1),
                rs2_addr: u8::from(self.decoded.rs2),
                rs1_rdata: self.rvfi_rs1_rdata,
                rs2_rdata: self.rvfi_rs2_rdata,
                rd_addr: u8::from(self.decoded.rd),
                rd_wdata: if word.reg_write && !suppress_commit { alu_result } else { 0 },
                mem_addr: self.rvfi_mem_addr,
                mem_rmask: self.rvfi_mem_rmask,
                mem_wmask: self.rvfi_mem_wmask,
                mem_rdata: self.rvfi_mem_rdata,
                mem_wdata: self.rvfi_mem_wdata,
                pc_rdata,
                pc_wdata: self.registers.pc(),
                trap: trapped,
                halt: false,
                intr,
                csr_rmask: self.rvfi_csr_rmask,
                csr_wmask: self.rvfi_csr_wmask,
                csr_rdata: self.rvfi_csr_rdata,
                csr_wdata: self.rvfi_csr_wdata,
            })
        } else {
            None
        }
    }

    fn csr_will_write_from(&self, decoded: &Decoded, operand: u32) -> bool {
        matches!(decoded.funct3, 0b001 | 0b101) || operand != 0
    }

    fn build_request(&self, word: &MicroWord, alu_result: u32, size: u32) -> Request {
        if word.insn_fetch {
            return Request { cyc: true, stb: true, address: self.registers.pc() >> 2, we: false, sel: 0b1111, write_data: 0 };
        }
        if !word.mem_req {
            return Request::IDLE;
        }
        let (sel, shift) = byte_lane(self.mem_addr_latch, size);
        let write_data = if word.write_mem { alu_result << shift } else { 0 };
        Request {
            cyc: true,
            stb: true,
            address: self.mem_addr_latch >> 2,
            we: word.write_mem,
            sel,
            write_data,
        }
    }

    /// Runs the dispatch-time or in-routine exception test selected by
    /// `except_ctl`, returning whether it fired and (if so) the `mcause`
    /// value it latches. See [`crate::microcode::word::ExceptCtl`] for
    /// why the CSR-specific check is kept distinct from the generic
    /// dispatch-time one.
    fn evaluate_except_ctl(&self, word: &MicroWord, alu_result: u32, irq_level: bool) -> (bool, u32) {
        match word.except_ctl {
            ExceptCtl::None | ExceptCtl::EnterTrap | ExceptCtl::LeaveTrap => (false, 0),
            ExceptCtl::LatchDecoderCause => {
                if self.decoded.illegal {
                    (true, cause::ILLEGAL_INSTRUCTION)
                } else if self.decoded.is_ebreak {
                    (true, cause::BREAKPOINT)
                } else if self.decoded.is_ecall {
                    (true, cause::ENVIRONMENT_CALL_FROM_M)
                } else if self.csr.irq_pending(irq_level) {
                    (true, cause::MACHINE_EXTERNAL_INTERRUPT)
                } else {
                    (false, 0)
                }
            }
            ExceptCtl::LatchCsrCause => {
                let will_write = self.csr_will_write_from(&self.decoded, self.a_latch);
                if csr::is_legal_access(self.decoded.csr, will_write) {
                    (false, 0)
                } else {
                    (true, cause::ILLEGAL_INSTRUCTION)
                }
            }
            ExceptCtl::LatchJumpTargetCause => {
                if alu_result % 4 != 0 {
                    (true, cause::INSTRUCTION_ADDRESS_MISALIGNED)
                } else {
                    (false, 0)
                }
            }
            ExceptCtl::LatchLoadAddressCause => {
                let size = mem_access_size(&self.decoded, MemSel::Auto);
                if alu_result % size != 0 {
                    (true, cause::LOAD_ADDRESS_MISALIGNED)
                } else {
                    (false, 0)
                }
            }
            ExceptCtl::LatchStoreAddressCause => {
                let size = mem_access_size(&self.decoded, MemSel::Auto);
                if alu_result % size != 0 {
                    (true, cause::STORE_ADDRESS_MISALIGNED)
                } else {
                    (false, 0)
                }
            }
        }
    }
}

/// Resolves the access width (in bytes) for the decoder's current
/// instruction, given a word's static `mem_sel`. `Auto` derives it from
/// `funct3`, which is how a single LOAD/STORE routine serves every
/// implemented width (§4.G/§4.I).
fn mem_access_size(decoded: &Decoded, mem_sel: MemSel) -> u32 {
    match mem_sel {
        MemSel::Byte => crate::unit::BYTE,
        MemSel::Halfword => crate::unit::HALFWORD,
        MemSel::Word => crate::unit::WORD,
        MemSel::Auto => match decoded.opcode {
            Opcode::Load => match decoded.funct3 {
                0b000 | 0b100 => crate::unit::BYTE,
                0b001 | 0b101 => crate::unit::HALFWORD,
                _ => crate::unit::WORD,
            },
            Opcode::Store => match decoded.funct3 {
                0b000 => crate::unit::BYTE,
                0b001 => crate::unit::HALFWORD,
                _ => crate::unit::WORD,
            },
            _ => crate::unit::WORD,
        },
    }
}

/// Byte-lane select mask and the bit shift into/out of that lane, for an
/// access of `size` bytes at byte address `addr`.
fn byte_lane(addr: u32, size: u32) -> (u8, u32) {
    let offset = addr & 0b11;
    let shift = offset * 8;
    let sel = match size {
        1 => 0b0001u8 << offset,
        2 => 0b0011u8 << offset,
        _ => 0b1111u8,
    };
    (sel, shift)
}

/// Extracts and extends a LOAD's value out of a raw 32-bit bus response,
/// per the decoded instruction's width/signedness (when `mem_sel =
/// Auto`) or the word's explicit `mem_extend` otherwise.
fn extend_load_data(raw: u32, decoded: &Decoded, mem_extend: MemExtend, mem_sel: MemSel, addr: u32) -> u32 {
    let size = mem_access_size(decoded, mem_sel);
    let (_, shift) = byte_lane(addr, size);
    let shifted = raw >> shift;
    let sign = match mem_sel {
        MemSel::Auto => matches!(decoded.funct3, 0b000 | 0b001),
        _ => matches!(mem_extend, MemExtend::Sign),
    };
    match size {
        1 => {
            let byte = shifted as u8;
            if sign { (byte as i8) as i32 as u32 } else { byte as u32 }
        }
        2 => {
            let half = shifted as u16;
            if sign { (half as i16) as i32 as u32 } else { half as u32 }
        }
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Request as BusRequest, Response as BusResponse};

    /// A word-addressed RAM `Bus` that acks every request after a fixed
    /// number of idle ticks, to exercise the wait-loop words.
    #[derive(Debug)]
    struct TestRam {
        words: Vec<u32>,
        latency: u32,
        countdown: u32,
    }

    impl TestRam {
        fn new(program: &[u32], latency: u32) -> Self {
            let mut words = program.to_vec();
            words.resize(4096, 0);
            Self { words, latency, countdown: 0 }
        }
    }

    impl Bus for TestRam {
        fn step(&mut self, request: BusRequest) -> BusResponse {
            if !request.cyc || !request.stb {
                self.countdown = 0;
                return BusResponse::default();
            }
            if self.countdown < self.latency {
                self.countdown += 1;
                return BusResponse::default();
            }
            self.countdown = 0;
            let idx = request.address as usize;
            if request.we {
                let mut word = self.words[idx];
                for lane in 0..4 {
                    if request.sel & (1 << lane) != 0 {
                        let shift = lane * 8;
                        word = (word & !(0xFFu32 << shift)) | (request.write_data & (0xFF << shift));
                    }
                }
                self.words[idx] = word;
                BusResponse { ack: true, read_data: 0 }
            } else {
                BusResponse { ack: true, read_data: self.words[idx] }
            }
        }
    }

    fn run_until_retire(core: &mut Core, bus: &mut dyn Bus, max_ticks: u32) -> RvfiTrace {
        for _ in 0..max_ticks {
            if let Some(trace) = core.tick(bus, false) {
                return trace;
            }
        }
        panic!("instruction did not retire within {max_ticks} ticks");
    }

    fn asm_i(opcode: u32, funct3: u32, rd: u32, rs1: u32, imm: u32) -> u32 {
        (imm << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    fn asm_r(opcode: u32, funct3: u32, funct7: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
        (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    #[test]
    fn addi_commits_and_retires() {
        let addi = asm_i(0b0010011, 0b000, 1, 0, 5); // addi x1, x0, 5
        let mut bus = TestRam::new(&[addi], 0);
        let mut core = Core::new(&Config::default());
        let trace = run_until_retire(&mut core, &mut bus, 16);
        assert_eq!(core.registers().x(Specifier::from_u5(1)), 5);
        assert_eq!(trace.pc_wdata, 4);
        assert!(!trace.trap);
    }

    #[test]
    fn add_reads_two_registers_across_ticks() {
        let addi1 = asm_i(0b0010011, 0b000, 1, 0, 7); // addi x1, x0, 7
        let addi2 = asm_i(0b0010011, 0b000, 2, 0, 35); // addi x2, x0, 35
        let add = asm_r(0b0110011, 0b000, 0, 3, 1, 2); // add x3, x1, x2
        let mut bus = TestRam::new(&[addi1, addi2, add], 0);
        let mut core = Core::new(&Config::default());
        run_until_retire(&mut core, &mut bus, 16);
        run_until_retire(&mut core, &mut bus, 16);
        run_until_retire(&mut core, &mut bus, 16);
        assert_eq!(core.registers().x(Specifier::from_u5(3)), 42);
    }

    #[test]
    fn slli_shift_loop_terminates_with_correct_result() {
        let li = asm_i(0b0010011, 0b000, 1, 0, 1); // addi x1, x0, 1
        let slli = asm_i(0b0010011, 0b001, 2, 1, 4); // slli x2, x1, 4
        let mut bus = TestRam::new(&[li, slli], 0);
        let mut core = Core::new(&Config::default());
        run_until_retire(&mut core, &mut bus, 16);
        run_until_retire(&mut core, &mut bus, 64);
        assert_eq!(core.registers().x(Specifier::from_u5(2)), 16);
    }

    #[test]
    fn store_then_load_round_trips_through_bus() {
        let li_addr = asm_i(0b0010011, 0b000, 1, 0, 0x100); // addi x1, x0, 0x100
        let li_val = asm_i(0b0010011, 0b000, 2, 0, 0xAB); // addi x2, x0, 0xAB
        let sb = (0 << 25) | (2 << 20) | (1 << 15) | (0b000 << 12) | (0 << 7) | 0b0100011; // sb x2, 0(x1)
        let lbu = asm_i(0b0000011, 0b100, 3, 1, 0); // lbu x3, 0(x1)
        let mut bus = TestRam::new(&[li_addr, li_val, sb, lbu], 1);
        let mut core = Core::new(&Config::default());
        for _ in 0..4 {
            run_until_retire(&mut core, &mut bus, 64);
        }
        assert_eq!(core.registers().x(Specifier::from_u5(3)), 0xAB);
    }

    #[test]
    fn illegal_instruction_traps_to_mtvec() {
        let illegal = 0b1111111u32; // reserved opcode
        let mut bus = TestRam::new(&[illegal], 0);
        let mut core = Core::new(&Config::default());
        core.csr.write(csr::MTVEC, 0x8000_0000, u32::MAX);
        let trace = run_until_retire(&mut core, &mut bus, 16);
        assert!(trace.trap);
        assert_eq!(core.registers().pc(), 0x8000_0000);
        assert_eq!(core.csr().mcause(), cause::ILLEGAL_INSTRUCTION);
    }

    #[test]
    fn mret_restores_pc_and_mie() {
        let mret = 0x3020_0073u32;
        let mut bus = TestRam::new(&[mret], 0);
        let mut core = Core::new(&Config::default());
        core.csr.set_mepc(0x4000);
        core.csr.set_mpie_bit(true);
        run_until_retire(&mut core, &mut bus, 16);
        assert_eq!(core.registers().pc(), 0x4000);
        assert!(core.csr().mie_bit());
    }

    #[test]
    fn csrrs_with_zero_rs1_reads_mhartid_without_faulting() {
        // csrrs x1, mhartid, x0
        let csrrs = asm_i(0b1110011, 0b010, 1, 0, 0xF14);
        let mut bus = TestRam::new(&[csrrs], 0);
        let mut core = Core::new(&Config::default());
        let trace = run_until_retire(&mut core, &mut bus, 16);
        assert!(!trace.trap);
        assert_eq!(core.registers().x(Specifier::from_u5(1)), 0);
    }

    #[test]
    fn external_irq_is_taken_between_instructions() {
        let addi1 = asm_i(0b0010011, 0b000, 1, 0, 1); // addi x1, x0, 1
        let addi2 = asm_i(0b0010011, 0b000, 2, 0, 2); // addi x2, x0, 2 (never retires)
        let mut bus = TestRam::new(&[addi1, addi2], 0);
        let mut core = Core::new(&Config::default());
        core.csr.write(csr::MTVEC, 0x100, u32::MAX);
        core.csr.write(csr::MIE, 1 << 11, u32::MAX);
        core.csr.write(csr::MSTATUS, 1 << 3, u32::MAX); // MIE=1

        let first = run_until_retire_with_irq(&mut core, &mut bus, 16, false);
        assert!(!first.trap);
        assert_eq!(core.registers().x(Specifier::from_u5(1)), 1);

        let second = run_until_retire_with_irq(&mut core, &mut bus, 16, true);
        assert!(second.trap);
        assert_eq!(core.csr().mcause(), cause::MACHINE_EXTERNAL_INTERRUPT);
        assert_eq!(core.csr().mepc(), 4); // PC of the instruction that would have run next
        assert_eq!(core.registers().pc(), 0x100);
    }

    fn run_until_retire_with_irq(core: &mut Core, bus: &mut dyn Bus, max_ticks: u32, irq_level: bool) -> RvfiTrace {
        for _ in 0..max_ticks {
            if let Some(trace) = core.tick(bus, irq_level) {
                return trace;
            }
        }
        panic!("instruction did not retire within {max_ticks} ticks");
    }
}
