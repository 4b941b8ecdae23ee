//! End-to-end scenarios driving whole instruction sequences through
//! `Core::tick`, each against a tiny flat `Bus` backed by a fixed word
//! program. These complement the unit tests kept alongside each module;
//! they exercise the full fetch/dispatch/commit pipeline the way a real
//! firmware image would.

use ucode_rv32i_core::bus::{Bus, Request, Response};
use ucode_rv32i_core::registers::Specifier;
use ucode_rv32i_core::{Config, Core};

#[derive(Debug)]
struct FlatBus {
    words: Vec<u32>,
}

impl FlatBus {
    fn new(program: &[u32]) -> Self {
        let mut words = program.to_vec();
        words.resize(4096, 0);
        Self { words }
    }
}

impl Bus for FlatBus {
    fn step(&mut self, request: Request) -> Response {
        if !request.cyc || !request.stb {
            return Response::default();
        }
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
            Response { ack: true, read_data: 0 }
        } else {
            Response { ack: true, read_data: self.words[idx] }
        }
    }
}

fn run_n_retirements(core: &mut Core, bus: &mut dyn Bus, n: usize) {
    let mut retired = 0;
    let mut ticks = 0;
    while retired < n {
        if core.tick(bus, false).is_some() {
            retired += 1;
        }
        ticks += 1;
        assert!(ticks < 10_000, "program did not retire {n} instructions in time");
    }
}

fn asm_i(opcode: u32, funct3: u32, rd: u32, rs1: u32, imm: u32) -> u32 {
    (imm << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn asm_r(opcode: u32, funct3: u32, funct7: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
}

fn asm_s(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: u32) -> u32 {
    let hi = (imm >> 5) & 0x7F;
    let lo = imm & 0x1F;
    (hi << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (lo << 7) | opcode
}

fn asm_b(opcode: u32, funct3: u32, rs1: u32, rs2: u32, imm: u32) -> u32 {
    let bit12 = (imm >> 12) & 0x1;
    let bit11 = (imm >> 11) & 0x1;
    let bits10_5 = (imm >> 5) & 0x3F;
    let bits4_1 = (imm >> 1) & 0xF;
    (bit12 << 31) | (bits10_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (bits4_1 << 8) | (bit11 << 7) | opcode
}

#[test]
fn addi_chain() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 5),            // addi x1, x0, 5
        asm_i(0b0010011, 0b000, 2, 1, (-3i32 as u32) & 0xFFF), // addi x2, x1, -3
        asm_i(0b0010011, 0b000, 3, 2, 7),             // addi x3, x2, 7
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 3);

    assert_eq!(core.registers().x(Specifier::from_u5(1)), 5);
    assert_eq!(core.registers().x(Specifier::from_u5(2)), 2);
    assert_eq!(core.registers().x(Specifier::from_u5(3)), 9);
    assert_eq!(core.registers().pc(), 0x0C);
}

#[test]
fn signed_vs_unsigned_compare() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 0xFFF), // addi x1, x0, -1
        asm_i(0b0010011, 0b000, 2, 0, 1),      // addi x2, x0, 1
        asm_r(0b0110011, 0b010, 0, 3, 1, 2),   // slt x3, x1, x2
        asm_r(0b0110011, 0b011, 0, 4, 1, 2),   // sltu x4, x1, x2
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 4);

    assert_eq!(core.registers().x(Specifier::from_u5(3)), 1);
    assert_eq!(core.registers().x(Specifier::from_u5(4)), 0);
}

#[test]
fn shift_of_zero_count_leaves_operand_intact() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 0x5A), // addi x1, x0, 0x5A
        asm_i(0b0010011, 0b001, 2, 1, 0),     // slli x2, x1, 0
        asm_i(0b0010011, 0b101, 3, 1, 0),     // srli x3, x1, 0
        asm_i(0b0010011, 0b101, 4, 1, 0b0100000 << 5), // srai x4, x1, 0
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 4);

    assert_eq!(core.registers().x(Specifier::from_u5(2)), 0x5A);
    assert_eq!(core.registers().x(Specifier::from_u5(3)), 0x5A);
    assert_eq!(core.registers().x(Specifier::from_u5(4)), 0x5A);
}

#[test]
fn shift_of_nonzero_count_produces_barrel_shift_result() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 1), // addi x1, x0, 1
        asm_i(0b0010011, 0b001, 2, 1, 1),  // slli x2, x1, 1
        asm_i(0b0010011, 0b000, 3, 0, 16), // addi x3, x0, 16
        asm_r(0b0110011, 0b001, 0, 4, 3, 1), // sll x4, x3, x1
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 4);

    assert_eq!(core.registers().x(Specifier::from_u5(2)), 2);
    assert_eq!(core.registers().x(Specifier::from_u5(4)), 32);
}

#[test]
fn load_store_byte_with_sign_extension() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 0xFFF),   // addi x1, x0, -1
        asm_s(0b0100011, 0b000, 0, 1, 0),        // sb x1, 0(x0)
        asm_i(0b0000011, 0b000, 2, 0, 0),        // lb x2, 0(x0)
        asm_i(0b0000011, 0b100, 3, 0, 0),        // lbu x3, 0(x0)
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 4);

    assert_eq!(core.registers().x(Specifier::from_u5(2)), 0xFFFF_FFFF);
    assert_eq!(core.registers().x(Specifier::from_u5(3)), 0x0000_00FF);
}

#[test]
fn branch_taken_and_not_taken() {
    let program = [
        asm_i(0b0010011, 0b000, 1, 0, 1),       // addi x1, x0, 1
        asm_i(0b0010011, 0b000, 2, 0, 1),       // addi x2, x0, 1
        asm_b(0b1100011, 0b000, 1, 2, 8),        // beq x1, x2, +8
        asm_i(0b0010011, 0b000, 3, 0, 99),       // addi x3, x0, 99 (skipped)
        asm_i(0b0010011, 0b000, 4, 0, 42),       // addi x4, x0, 42
    ];
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 4); // addi, addi, beq (taken), addi x4

    assert_eq!(core.registers().x(Specifier::from_u5(3)), 0);
    assert_eq!(core.registers().x(Specifier::from_u5(4)), 42);
    assert_eq!(core.registers().pc(), 5 * 4);
}

#[test]
fn trap_on_illegal_instruction() {
    let program = [0u32]; // all-zero word: reserved opcode
    let mut bus = FlatBus::new(&program);
    let mut core = Core::new(&Config::default());
    run_n_retirements(&mut core, &mut bus, 1);

    assert_eq!(core.csr().mcause(), 2);
    assert_eq!(core.csr().mepc(), 0);
    assert_eq!(core.registers().pc(), 0);
}
