// C7: the driver. Reads a raw little-endian word stream off stdin, prints
// a disassembly of the loaded image, evaluates it, and prints the result or
// the diagnostic. Deliberately thin — an external collaborator to the core,
// not part of the library's public contract. Grounded in
// `original_source/src/avm.c`'s `main`.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use avm::{disasm, memory};

fn words_from_bytes(bytes: &[u8]) -> Vec<u64> {
    // Trailing bytes that don't fill a whole word are discarded, not
    // zero-extended — §6/§9 call this out explicitly.
    bytes
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

fn main() -> ExitCode {
    env_logger::init();

    if io::stdin().is_terminal() {
        eprintln!("avm: reading a little-endian word stream from stdin");
    }

    let bytes = match memory::read_all(io::stdin()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("err: unable to read stdin: {e}");
            return ExitCode::FAILURE;
        }
    };
    let oplen = bytes.len() / 8;
    let image = words_from_bytes(&bytes[..oplen * 8]);

    match disasm::stringify_range(&image, 0, image.len() as u32) {
        Ok(listing) => {
            if !listing.is_empty() {
                println!("{listing}");
            }
        }
        Err(e) => eprintln!("err: unable to disassemble initial image: {e}"),
    }

    let mut ctx = avm::Context::new(&image);
    match ctx.evaluate() {
        Ok(result) => {
            println!("{result}");
            ExitCode::from((result & 0xFF) as u8)
        }
        Err(e) => {
            eprintln!("err: {e}");
            ExitCode::FAILURE
        }
    }
}
