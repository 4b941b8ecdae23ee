mod flat_memory;

use clap::Parser;
use flat_memory::FlatMemory;
use goblin::elf::program_header::PT_LOAD;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use ucode_rv32i_core::{Config, Core};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Firmware ELF image to run.
    elf: String,

    /// Signature file to dump the `begin_signature..end_signature` range
    /// to, in riscv-tests' compliance-suite convention.
    #[arg(long, short)]
    signature: Option<String>,

    /// Maximum number of micro-ticks to run before giving up, in case the
    /// image never traps or reaches a natural stopping point.
    #[arg(long, default_value_t = 10_000_000)]
    max_ticks: u64,

    /// Print the RVFI trace of every retired instruction, one line each.
    #[arg(long)]
    trace: bool,
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut buf = Vec::new();
    let mut file = File::open(&args.elf)?;
    file.read_to_end(&mut buf)?;

    let elf = goblin::elf::Elf::parse(&buf).expect("failed to parse elf file");

    let mut memory = FlatMemory::new(0);
    for header in elf.program_headers.iter().filter(|h| h.p_type == PT_LOAD) {
        memory.load(header.p_paddr as u32, &buf[header.file_range()]);
    }

    let mut core = Core::new(&Config { reset_vector: elf.entry as u32 });

    const ECALL_INSN: u32 = 0x0000_0073;
    for _ in 0..args.max_ticks {
        if let Some(trace) = core.tick(&mut memory, false) {
            if args.trace {
                println!(
                    "{:>10} pc_rdata={:#010x} pc_wdata={:#010x} insn={:#010x} rd={:2}<-{:#010x} trap={}",
                    trace.order, trace.pc_rdata, trace.pc_wdata, trace.insn, trace.rd_addr, trace.rd_wdata, trace.trap
                );
            }
            // No board, no WFI, no power-down flag to poll (§6a): a
            // trapped ECALL is this runner's only "program is done" signal.
            if trace.trap && trace.insn == ECALL_INSN {
                break;
            }
        }
    }

    if let Some(path) = args.signature {
        let mut signature_start = None;
        let mut signature_end = None;
        for sym in elf.syms.iter() {
            let Some(name) = elf.strtab.get_at(sym.st_name) else {
                continue;
            };
            if name == "begin_signature" {
                signature_start = Some(sym.st_value as u32);
            } else if name == "end_signature" {
                signature_end = Some(sym.st_value as u32);
            }
        }
        let signature_start = signature_start.expect("missing symbol `begin_signature`");
        let signature_end = signature_end.expect("missing symbol `end_signature`");

        assert!(signature_start % 16 == 0);
        assert!(signature_end % 4 == 0);
        assert!(signature_start <= signature_end);

        let mut file = File::create(path)?;
        for address in (signature_start..signature_end).step_by(4) {
            writeln!(file, "{:08x}", memory.read_word(address))?;
        }
    }

    Ok(())
}
