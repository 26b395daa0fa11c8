// C2: the instruction word.
//
// A 64-bit value packed as `(kind: 8, size: 24, address: 32)`, little-endian
// at the byte level so offset 0 of the word is the opcode. Grounded in
// `original_source/src/avm_def.h`'s `AVM_Operation` union; reimplemented as
// a transparent newtype with explicit accessors instead of a union, per
// §9's "Union-punned instruction word" design note.

use crate::memory::ADDR_MAX;

/// The largest representable value in the VM's 64-bit value domain.
pub const VAL_MAX: u64 = u64::MAX;

/// The number of opcodes the dispatch table and the disassembler's
/// stringifier table are indexed by. `dup` (§9's open question, resolved in
/// `SPEC_FULL.md` A6) is counted here as a real 17th opcode.
pub const OPCODE_COUNT: u8 = 17;

/// Every opcode the evaluator, assembler and disassembler agree on.
/// Numeric order is load-bearing: it is both the dispatch index and the
/// order the assembler's mnemonic table is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Error = 0,
    Load = 1,
    Store = 2,
    Push = 3,
    Add = 4,
    Sub = 5,
    And = 6,
    Or = 7,
    Xor = 8,
    Shr = 9,
    Shl = 10,
    Calli = 11,
    Call = 12,
    Ret = 13,
    Jmpez = 14,
    Quit = 15,
    /// Reserved extra: push a copy of the top of the stack. See
    /// `SPEC_FULL.md` A6.
    Dup = 16,
}

impl Opcode {
    pub const MNEMONICS: [&'static str; OPCODE_COUNT as usize] = [
        "error", "load", "store", "push", "add", "sub", "and", "or", "xor", "shr", "shl", "calli",
        "call", "ret", "jmpez", "quit", "dup",
    ];

    pub fn mnemonic(self) -> &'static str {
        Self::MNEMONICS[self as usize]
    }

    /// Any raw kind value `>= OPCODE_COUNT` is rewritten to `Error` before
    /// dispatch, both in the evaluator and the disassembler (§4.4, §4.5).
    pub fn from_kind(kind: u8) -> Opcode {
        match kind {
            0 => Opcode::Error,
            1 => Opcode::Load,
            2 => Opcode::Store,
            3 => Opcode::Push,
            4 => Opcode::Add,
            5 => Opcode::Sub,
            6 => Opcode::And,
            7 => Opcode::Or,
            8 => Opcode::Xor,
            9 => Opcode::Shr,
            10 => Opcode::Shl,
            11 => Opcode::Calli,
            12 => Opcode::Call,
            13 => Opcode::Ret,
            14 => Opcode::Jmpez,
            15 => Opcode::Quit,
            16 => Opcode::Dup,
            _ => Opcode::Error,
        }
    }
}

/// A decoded instruction word: `(kind, size, address)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word(u64);

impl Word {
    /// Builds a word from its three fields. `size` is truncated to 24 bits,
    /// matching the bitfield's width.
    pub fn from_parts(kind: u8, size: u32, address: u32) -> Word {
        let kind = kind as u64;
        let size = (size & 0x00FF_FFFF) as u64;
        let address = address as u64;
        Word(kind | (size << 8) | (address << 32))
    }

    /// Wraps a raw 64-bit value without reinterpreting it — used when a
    /// heap slot is read as data rather than as an instruction.
    pub fn from_raw(raw: u64) -> Word {
        Word(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn kind_byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn opcode(self) -> Opcode {
        Opcode::from_kind(self.kind_byte())
    }

    pub fn size(self) -> u32 {
        ((self.0 >> 8) & 0x00FF_FFFF) as u32
    }

    pub fn address(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl From<Word> for u64 {
    fn from(w: Word) -> u64 {
        w.0
    }
}

impl From<u64> for Word {
    fn from(raw: u64) -> Word {
        Word(raw)
    }
}

const _: () = assert!(ADDR_MAX == u32::MAX);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_fields() {
        let w = Word::from_parts(Opcode::Load as u8, 0x00AB_CDEF, 0x1234_5678);
        assert_eq!(w.opcode(), Opcode::Load);
        assert_eq!(w.size(), 0x00AB_CDEF);
        assert_eq!(w.address(), 0x1234_5678);
    }

    #[test]
    fn size_is_truncated_to_24_bits() {
        let w = Word::from_parts(0, 0xFFFF_FFFF, 0);
        assert_eq!(w.size(), 0x00FF_FFFF);
    }

    #[test]
    fn opcode_byte_sits_at_the_low_byte() {
        let w = Word::from_parts(Opcode::Quit as u8, 0, 0);
        assert_eq!(w.raw() & 0xFF, Opcode::Quit as u64);
    }

    #[test]
    fn unknown_kind_rewrites_to_error() {
        assert_eq!(Opcode::from_kind(200), Opcode::Error);
    }
}
