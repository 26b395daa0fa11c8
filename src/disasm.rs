// C5: the disassembler.
//
// Grounded in `original_source/src/avm_stringify.c`'s `avm_stringify_one`
// and `avm_stringify_range`. Operates on a plain `&[u64]` memory image
// rather than a live `Context`, so it can disassemble an assembled image
// before anything is ever evaluated (the driver does exactly this, §6).

use crate::error::CoreError;
use crate::memory::add_overflow_check;
use crate::word::{Opcode, Word};

fn heap_get(memory: &[u64], loc: u32) -> u64 {
    memory.get(loc as usize).copied().unwrap_or(0)
}

/// Decodes and formats the instruction at `ins`, returning its text and the
/// address of the next instruction. `push` consumes an extra word.
pub fn stringify_one(memory: &[u64], ins: u32) -> (String, u32) {
    let word = Word::from_raw(heap_get(memory, ins));
    let opcode = word.opcode();
    match opcode {
        Opcode::Load => (
            format!("load\t{}w\t0x{:04x}", word.size(), word.address()),
            ins + 1,
        ),
        Opcode::Store => (
            format!("store\t{}w\t0x{:04x}", word.size(), word.address()),
            ins + 1,
        ),
        Opcode::Push => {
            let value = heap_get(memory, ins.wrapping_add(1));
            (
                format!("push\t0x{value:016x} (dec. {value})"),
                ins + 2,
            )
        }
        Opcode::Calli => (format!("call\t0x{:04x}", word.address()), ins + 1),
        Opcode::Jmpez => (format!("jumpez\t0x{:04x}", word.address()), ins + 1),
        Opcode::Error => (format!("error\t0x{:016x}", word.raw()), ins + 1),
        _ => (opcode.mnemonic().to_string(), ins + 1),
    }
}

/// Produces one line per decoded instruction in `[ins, ins+len)`, prefixed
/// with the instruction's address. Empty range yields the empty string.
pub fn stringify_range(memory: &[u64], ins: u32, len: u32) -> Result<String, CoreError> {
    if add_overflow_check(ins, len) {
        return Err(CoreError::AddressOutOfBounds { address: ins, size: len });
    }
    let end = ins + len;
    let mut lines = Vec::new();
    let mut at = ins;
    while at < end {
        let (text, next) = stringify_one(memory, at);
        lines.push(format!("{at:04x}:\t{text}"));
        at = next;
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_consumes_its_immediate_and_counts_as_one_line() {
        let memory = vec![
            Word::from_parts(Opcode::Push as u8, 0, 0).raw(),
            42,
            Word::from_parts(Opcode::Quit as u8, 0, 0).raw(),
        ];
        let listing = stringify_range(&memory, 0, 3).unwrap();
        assert_eq!(listing.lines().count(), 2);
    }

    #[test]
    fn load_store_format_size_and_address() {
        let memory = vec![Word::from_parts(Opcode::Load as u8, 4, 0x100).raw()];
        let (text, next) = stringify_one(&memory, 0);
        assert_eq!(text, "load\t4w\t0x0100");
        assert_eq!(next, 1);
    }

    #[test]
    fn empty_range_is_empty_string() {
        let memory = vec![];
        assert_eq!(stringify_range(&memory, 0, 0).unwrap(), "");
    }

    #[test]
    fn range_overflowing_addr_max_fails() {
        let memory = vec![];
        assert!(stringify_range(&memory, 1, crate::memory::ADDR_MAX).is_err());
    }
}
