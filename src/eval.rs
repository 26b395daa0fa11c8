// C4: the evaluator.
//
// Fetch/decode/dispatch loop plus per-opcode semantics. Grounded in
// `original_source/src/avm_eval.c`'s `avm_eval` and its opcode handlers;
// kept as a single `match` over `Opcode` rather than the original's
// function-pointer table, per §9's dispatch-table design note — the
// ordering still tracks `Opcode`'s numeric values.

use log::{trace, warn};

use crate::context::Context;
use crate::error::CoreError;
use crate::word::{Opcode, Word};

impl Context {
    /// Runs the fetch/execute loop until `quit` or a failing handler ends
    /// it. Returns the popped `quit` operand on success; on failure the
    /// diagnostic is both returned and recorded on `self.error`, matching
    /// `avm_eval`'s `ctx->error` contract (§3 invariant 5).
    pub fn evaluate(&mut self) -> Result<u64, CoreError> {
        self.error = None;
        loop {
            match self.step() {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => continue,
                Err(e) => {
                    warn!("evaluation failed at ins={:#x}: {e}", self.ins);
                    self.error = Some(e.to_string());
                    return Err(e);
                }
            }
        }
    }

    /// Executes one instruction. `Ok(Some(v))` means `quit` was hit with
    /// result `v`; `Ok(None)` means the loop should continue.
    fn step(&mut self) -> Result<Option<u64>, CoreError> {
        let word = self.fetch(self.ins);
        trace!("ins={:#x} word={:#018x} kind={:?}", self.ins, word.raw(), word.opcode());

        let opcode = word.opcode();
        if opcode == Opcode::Quit {
            let result = self.stack_pop()?;
            return Ok(Some(result));
        }

        self.dispatch(opcode, word)?;
        self.ins = self.ins.wrapping_add(1);
        trace!("stack depth after step: {}", self.stack_len());
        Ok(None)
    }

    fn dispatch(&mut self, opcode: Opcode, word: Word) -> Result<(), CoreError> {
        match opcode {
            Opcode::Error => Err(CoreError::InvalidOpcode { word: word.raw() }),
            Opcode::Load => self.op_load(word.size(), word.address()),
            Opcode::Store => self.op_store(word.size(), word.address()),
            Opcode::Push => self.op_push(),
            Opcode::Add => self.op_binary(|a, b| a.wrapping_add(b)),
            Opcode::Sub => self.op_binary(|a, b| a.wrapping_sub(b)),
            Opcode::And => self.op_binary(|a, b| a & b),
            Opcode::Or => self.op_binary(|a, b| a | b),
            Opcode::Xor => self.op_binary(|a, b| a ^ b),
            Opcode::Shr => self.op_binary(|a, b| a >> (b & 0x3F)),
            Opcode::Shl => self.op_binary(|a, b| a << (b & 0x3F)),
            Opcode::Calli => self.op_calli(word.address()),
            Opcode::Call => self.op_call(),
            Opcode::Ret => self.op_ret(),
            Opcode::Jmpez => self.op_jmpez(word.address()),
            Opcode::Dup => self.op_dup(),
            Opcode::Quit => unreachable!("quit is handled in step()"),
        }
    }

    fn op_load(&mut self, size: u32, address: u32) -> Result<(), CoreError> {
        Context::check_range(address, size)?;
        for idx in address..address + size {
            let v = self.heap_get(idx);
            self.stack_push(v)?;
        }
        Ok(())
    }

    fn op_store(&mut self, size: u32, address: u32) -> Result<(), CoreError> {
        Context::check_range(address, size)?;
        for idx in address..address + size {
            let v = self.stack_pop()?;
            self.heap_set(idx, v)?;
        }
        Ok(())
    }

    /// Reads the immediate from `memory[ins+1]` and advances one extra word
    /// so the main loop's `ins += 1` lands past it (§4.4).
    fn op_push(&mut self) -> Result<(), CoreError> {
        let value = self.heap_get(self.ins.wrapping_add(1));
        self.stack_push(value)?;
        self.ins = self.ins.wrapping_add(1);
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), CoreError> {
        let top = self.stack_peek()?;
        self.stack_push(top)
    }

    fn op_binary(&mut self, f: impl FnOnce(u64, u64) -> u64) -> Result<(), CoreError> {
        let a = self.stack_pop()?;
        let b = self.stack_pop()?;
        self.stack_push(f(a, b))
    }

    /// Pushes the call site's own address (`self.ins`, not the jump target)
    /// as the return anchor, then sets `ins = address - 1` so the main
    /// loop's increment lands exactly on `address`. See `SPEC_FULL.md` A8
    /// for why the anchor is the call site and not the target.
    fn op_calli(&mut self, address: u32) -> Result<(), CoreError> {
        self.call_stack_push(self.ins)?;
        self.ins = address.wrapping_sub(1);
        Ok(())
    }

    fn op_call(&mut self) -> Result<(), CoreError> {
        let target = self.stack_pop()?;
        let target = target as u32;
        self.call_stack_push(self.ins)?;
        self.ins = target.wrapping_sub(1);
        Ok(())
    }

    /// Checks for underflow before popping (§9's resolved open question),
    /// then resumes at the popped call site with no adjustment — the main
    /// loop's ordinary `+1` carries execution one past it.
    fn op_ret(&mut self) -> Result<(), CoreError> {
        let anchor = self.call_stack_pop()?;
        self.ins = anchor;
        Ok(())
    }

    fn op_jmpez(&mut self, address: u32) -> Result<(), CoreError> {
        let t = self.stack_pop()?;
        if t == 1 {
            self.ins = address.wrapping_sub(1);
        }
        Ok(())
    }
}
