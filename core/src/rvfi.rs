//! RVFI-style retirement trace: one record per retired instruction (or
//! trap entry), emitted for external formal/co-simulation consumption.
//!
//! This mirrors the subset of the standard RISC-V Formal Interface signals
//! that make sense for a single-hart, M-mode-only, no-MMU core; it is not
//! a full implementation of the RVFI signal list (no PMP, no physical vs.
//! virtual address split, no memory-model ordering signals).

/// One retirement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RvfiTrace {
    /// Always `true`: a [`RvfiTrace`] only exists for a tick that actually
    /// retired (or trapped) an instruction, so this is never emitted false.
    pub valid: bool,
    /// Monotonically increasing retirement order, starting at 0.
    pub order: u64,
    pub pc_rdata: u32,
    pub pc_wdata: u32,
    pub insn: u32,
    /// Always 3 (M-mode): this core implements no other privilege level.
    pub mode: u8,
    /// Always 1 (XLEN=32), per RVFI's `MISA.MXL`-derived encoding.
    pub ixl: u8,
    pub rs1_addr: u8,
    pub rs2_addr: u8,
    pub rs1_rdata: u32,
    pub rs2_rdata: u32,
    pub rd_addr: u8,
    pub rd_wdata: u32,
    pub mem_addr: u32,
    pub mem_rmask: u8,
    pub mem_wmask: u8,
    pub mem_rdata: u32,
    pub mem_wdata: u32,
    /// Set instead of a normal retirement when this instruction trapped.
    pub trap: bool,
    /// Always `false`: this core has no halt state to report.
    pub halt: bool,
    /// Set on the first instruction fetched after a trap entry (i.e. the
    /// handler's first retired instruction), not on the trapping
    /// instruction itself.
    pub intr: bool,
    pub csr_rmask: u32,
    pub csr_wmask: u32,
    pub csr_rdata: u32,
    pub csr_wdata: u32,
}
