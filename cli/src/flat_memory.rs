//! A flat, in-memory Wishbone-Classic slave backing an ELF image.
//!
//! This is deliberately a CLI-local concern: the core crate never depends
//! on any particular bus backend (per its bus-peripheral-fabric
//! exclusion), so a demo binary that wants to actually run firmware has to
//! bring its own slave. Real hardware (or a richer board model) would
//! replace this with a proper address-mapped fabric; this one is just
//! enough memory to load an ELF's `PT_LOAD` segments into and run.

use ucode_rv32i_core::bus::{Bus, Request, Response};

/// Word-addressed flat memory, acking every request after one tick.
#[derive(Debug)]
pub struct FlatMemory {
    words: Vec<u32>,
}

impl FlatMemory {
    /// Allocates `size_bytes` (rounded up to a whole number of words) of
    /// zeroed memory.
    pub fn new(size_bytes: usize) -> Self {
        Self {
            words: vec![0; size_bytes.div_ceil(4)],
        }
    }

    /// Copies `data` into memory starting at byte address `addr`, growing
    /// the backing store if the segment runs past its current end. `addr`
    /// need not be word-aligned (an ELF `PT_LOAD` segment's `p_paddr`
    /// generally isn't); each byte is placed individually at its own
    /// word/lane rather than assuming `data` starts on a word boundary.
    pub fn load(&mut self, addr: u32, data: &[u8]) {
        let end_word = (addr as usize + data.len()).div_ceil(4);
        if end_word > self.words.len() {
            self.words.resize(end_word, 0);
        }
        for (i, &byte) in data.iter().enumerate() {
            let byte_addr = addr as usize + i;
            let word_index = byte_addr / 4;
            let shift = (byte_addr % 4) * 8;
            let word = self.words[word_index];
            self.words[word_index] = (word & !(0xFFu32 << shift)) | (u32::from(byte) << shift);
        }
    }

    /// Reads one word directly, bypassing the bus handshake; used only for
    /// the post-run signature dump.
    pub fn read_word(&self, byte_addr: u32) -> u32 {
        self.words[byte_addr as usize / 4]
    }
}

impl Bus for FlatMemory {
    fn step(&mut self, request: Request) -> Response {
        if !request.cyc || !request.stb {
            return Response::default();
        }
        let index = request.address as usize;
        if index >= self.words.len() {
            return Response { ack: true, read_data: 0 };
        }
        if request.we {
            let mut word = self.words[index];
            for lane in 0..4 {
                if request.sel & (1 << lane) != 0 {
                    let shift = lane * 8;
                    word = (word & !(0xFF << shift)) | (request.write_data & (0xFF << shift));
                }
            }
            self.words[index] = word;
            Response { ack: true, read_data: 0 }
        } else {
            Response { ack: true, read_data: self.words[index] }
        }
    }
}
