//! Defines a Wishbone-Classic-like bus interface (component I's external
//! edge): the single master/slave handshake the fetch/load/store unit
//! drives every tick it needs memory.
//!
//! This replaces a TileLink-style "always completes, arbitrary size" model
//! with the narrower single-cycle-request/single-cycle-ack shape real
//! Wishbone-Classic hardware has: one 32-bit word per transfer, byte-select
//! for sub-word granularity, and an explicit `ack` that can be withheld for
//! any number of ticks to model a slow peripheral or memory.

use std::fmt::Debug;

/// One Wishbone-Classic-like bus transaction, as driven by the core's
/// fetch/load/store unit for exactly one tick.
///
/// `address` is a *word* address (30 bits of meaningful range): the core
/// never issues a byte address on this interface, matching classic
/// Wishbone's `ADR_O` convention for a 32-bit port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub cyc: bool,
    pub stb: bool,
    /// Word address; only the low 30 bits are meaningful.
    pub address: u32,
    /// Asserted for a write, clear for a read.
    pub we: bool,
    /// Byte lane select, one bit per byte of `write_data`.
    pub sel: u8,
    pub write_data: u32,
}

impl Request {
    pub const IDLE: Request = Request {
        cyc: false,
        stb: false,
        address: 0,
        we: false,
        sel: 0,
        write_data: 0,
    };
}

/// The slave's response to a [`Request`] for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Response {
    pub ack: bool,
    pub read_data: u32,
}

/// A Wishbone-Classic-like slave.
///
/// Implementors see this as the slave side of the handshake; the core's
/// fetch/load/store unit is the sole master. A slave may withhold `ack`
/// for any number of calls while `cyc`/`stb` stay asserted, modeling
/// multi-cycle memory; the master always re-presents the same `Request`
/// until it observes `ack`, exactly as classic Wishbone requires.
///
/// `step` is called once per core tick regardless of whether a
/// transaction is in flight (with `Request::IDLE` when not), so a slave
/// may use it to age an internal latency counter.
pub trait Bus: Debug {
    fn step(&mut self, request: Request) -> Response;
}
