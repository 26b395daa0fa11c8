// C6: the textual assembler.
//
// Lexer and parser for the label/mnemonic/number source syntax in §4.6,
// grounded in `original_source/src/avm_parse.c`'s `avm_lex`/`avm_parse` and
// shaped after the byte-position-tracked lexer in
// `sarnowski-lona`'s `reader/lexer.rs` (a `Peekable` byte cursor rather
// than a parser-combinator grammar, since every diagnostic here needs the
// exact byte offset of the lexer's position — something easier to track by
// hand than to thread through a combinator library).

use crate::error::AsmError;
use crate::word::{Opcode, Word};

const SLACK: usize = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Label(u32),
    Mnemonic(Opcode),
    Num { value: u64, offset: usize },
    Eof,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Lexer<'a> {
        Lexer { src: src.as_bytes(), pos: 0 }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Advances while the current byte is neither `\n` nor end of input —
    /// the corrected semantics §9 calls out (`||` vs `&&` in the earliest
    /// revision).
    fn skip_to_newline(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_hex_digits(&mut self) -> Option<u64> {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_hexdigit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return None;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).ok()?;
        u64::from_str_radix(text, 16).ok()
    }

    fn read_ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.src[start..self.pos]).ok()
    }

    /// Lexes one token, trying label, then mnemonic, then number, then EOF,
    /// in that order — labels take precedence because a bare number
    /// immediately followed by `:` must not be mistaken for a `Num` that
    /// happens to be followed by a colon.
    fn next_token(&mut self) -> Result<Token, AsmError> {
        self.skip_whitespace();
        let offset = self.pos;

        if self.peek_byte().is_none() {
            return Ok(Token::Eof);
        }

        // Rule 1: label = hex number immediately followed by `:`.
        let save = self.pos;
        if let Some(value) = self.read_hex_digits() {
            if self.peek_byte() == Some(b':') {
                self.pos += 1;
                let value = u32::try_from(value).map_err(|_| AsmError::LabelOutOfBounds { offset })?;
                return Ok(Token::Label(value));
            }
        }
        self.pos = save;

        // Rule 2: mnemonic = maximal run of ASCII letters matching the table.
        let save = self.pos;
        if let Some(ident) = self.read_ident() {
            if let Some(opcode) = mnemonic_to_opcode(ident) {
                return Ok(Token::Mnemonic(opcode));
            }
        }
        self.pos = save;

        // Rule 3: bare hex number.
        if let Some(value) = self.read_hex_digits() {
            return Ok(Token::Num { value, offset });
        }

        Err(AsmError::UnknownToken { offset })
    }
}

fn mnemonic_to_opcode(ident: &str) -> Option<Opcode> {
    Opcode::MNEMONICS
        .iter()
        .position(|m| *m == ident)
        .map(|kind| Opcode::from_kind(kind as u8))
}

/// Growable word buffer for the assembled image; mirrors `avm_parse.c`'s
/// emission buffer (begins at `SLACK` capacity, grows by `SLACK` whenever
/// the write offset gets within two words of the end).
struct Emitter {
    words: Vec<u64>,
    write_offset: usize,
    highest_written: usize,
}

impl Emitter {
    fn new() -> Emitter {
        Emitter { words: vec![0u64; SLACK], write_offset: 0, highest_written: 0 }
    }

    fn reserve(&mut self, offset: usize) -> Result<(), AsmError> {
        if offset + 2 >= self.words.len() {
            let new_len = offset + SLACK;
            let additional = new_len - self.words.len();
            self.words
                .try_reserve_exact(additional)
                .map_err(|_| AsmError::AllocFailed { offset })?;
            self.words.resize(new_len, 0);
        }
        Ok(())
    }

    fn emit(&mut self, word: u64) -> Result<(), AsmError> {
        self.reserve(self.write_offset)?;
        self.words[self.write_offset] = word;
        self.highest_written = self.highest_written.max(self.write_offset);
        self.write_offset += 1;
        Ok(())
    }

    fn set_offset(&mut self, offset: u32) -> Result<(), AsmError> {
        self.write_offset = offset as usize;
        self.reserve(self.write_offset)
    }

    fn finish(self) -> Vec<u64> {
        let mut words = self.words;
        words.truncate(self.highest_written + 1);
        words
    }
}

/// Assembles `source` into a word image. Returns the byte offset of the
/// failing token on error, per §4.6/§7.
pub fn assemble(source: &str) -> Result<Vec<u64>, AsmError> {
    let mut lexer = Lexer::new(source);
    let mut emitter = Emitter::new();

    loop {
        let token = lexer.next_token()?;
        match token {
            Token::Eof => break,
            Token::Label(offset) => {
                emitter.set_offset(offset)?;
            }
            // Deliberately stricter than the source's parse loop, which has
            // no branch for a bare number and silently skips it: see
            // SPEC_FULL.md A6.
            Token::Num { offset, .. } => {
                return Err(AsmError::UnknownToken { offset });
            }
            Token::Mnemonic(opcode) => {
                assemble_instruction(&mut lexer, &mut emitter, opcode)?;
                lexer.skip_to_newline();
            }
        }
    }

    Ok(emitter.finish())
}

fn expect_num(lexer: &mut Lexer, on_missing: impl FnOnce(usize) -> AsmError) -> Result<u64, AsmError> {
    lexer.skip_whitespace();
    let offset = lexer.pos;
    match lexer.read_hex_digits() {
        Some(v) => Ok(v),
        None => Err(on_missing(offset)),
    }
}

fn assemble_instruction(lexer: &mut Lexer, emitter: &mut Emitter, opcode: Opcode) -> Result<(), AsmError> {
    match opcode {
        Opcode::Load | Opcode::Store => {
            let offset = lexer.pos;
            let size = expect_num(lexer, |offset| AsmError::ExpectedSize { offset })?;
            let address = expect_num(lexer, |offset| AsmError::ExpectedAddress { offset })?;
            if size > (1u64 << 24) || address > u32::MAX as u64 {
                return Err(AsmError::OperandOutOfBounds { offset });
            }
            emitter.emit(Word::from_parts(opcode as u8, size as u32, address as u32).raw())
        }
        Opcode::Calli | Opcode::Jmpez => {
            let offset = lexer.pos;
            let address = expect_num(lexer, |offset| AsmError::ExpectedAddress { offset })?;
            if address > u32::MAX as u64 {
                return Err(AsmError::OperandOutOfBounds { offset });
            }
            emitter.emit(Word::from_parts(opcode as u8, 0, address as u32).raw())
        }
        Opcode::Push => {
            let value = expect_num(lexer, |offset| AsmError::ExpectedValue { offset })?;
            emitter.emit(Word::from_parts(opcode as u8, 0, 0).raw())?;
            emitter.emit(value)
        }
        _ => emitter.emit(Word::from_parts(opcode as u8, 0, 0).raw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn unknown_token_reports_offset_zero() {
        assert_eq!(assemble("foo"), Err(AsmError::UnknownToken { offset: 0 }));
    }

    #[test]
    fn add_two_constants() {
        let image = assemble("push 3\npush 4\nadd\nquit").unwrap();
        let mut ctx = Context::new(&image);
        assert_eq!(ctx.evaluate().unwrap(), 7);
    }

    #[test]
    fn labels_place_a_subroutine() {
        let source = "0: push 5\ncalli 14\nquit\n14: push 6\nadd\nret";
        let image = assemble(source).unwrap();
        let mut ctx = Context::new(&image);
        assert_eq!(ctx.evaluate().unwrap(), 11);
    }

    #[test]
    fn operand_out_of_bounds_on_oversized_size() {
        let err = assemble("load 2000000 0").unwrap_err();
        assert!(matches!(err, AsmError::OperandOutOfBounds { .. }));
    }
}
