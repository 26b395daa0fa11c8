//! A small stack-based bytecode virtual machine.
//!
//! AVM executes programs made of fixed-width 64-bit instruction words over
//! an unsigned 64-bit value domain, with a growable linear heap, a growable
//! evaluation stack, and a separate call stack. This crate is the
//! interpreter pipeline: the instruction encoding and memory-image layout
//! (`word`), the machine state (`context`), the evaluator (`eval`), a
//! textual assembler (`asm`) and a disassembler (`disasm`). The command-line
//! driver lives in `src/bin/avm.rs` and is a thin external collaborator,
//! not part of this crate's public contract.
//!
//! All arithmetic wraps modulo 2⁶⁴; addresses are 32-bit and capped at
//! `ADDR_MAX`. There is no garbage collector, no floating point, no signed
//! opcodes and no concurrency — see `SPEC_FULL.md` for the full contract.

pub mod asm;
pub mod context;
pub mod disasm;
pub mod error;
pub mod eval;
pub mod memory;
pub mod word;

pub use context::Context;
pub use error::{AsmError, CoreError};
pub use memory::ADDR_MAX;
pub use word::{Opcode, Word, VAL_MAX};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_add_two_constants() {
        let image = asm::assemble("push 3\npush 4\nadd\nquit").unwrap();
        let mut ctx = Context::new(&image);
        assert_eq!(ctx.evaluate().unwrap(), 7);
    }

    #[test]
    fn disassembly_of_assembled_image_has_one_line_per_instruction() {
        let image = asm::assemble("push 3\npush 4\nadd\nquit").unwrap();
        let listing = disasm::stringify_range(&image, 0, image.len() as u32).unwrap();
        assert_eq!(listing.lines().count(), 4);
    }
}
