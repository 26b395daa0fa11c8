//! End-to-end source-to-result scenarios, one per §8 "Scenarios" entry.
//!
//! These exercise the full source -> image -> evaluator pipeline, the way
//! `sarnowski-lona`'s `tests/integration_test.rs` exercises its VM end to
//! end rather than one component in isolation.

use avm::asm;
use avm::Context;

fn run(source: &str) -> u64 {
    let image = asm::assemble(source).expect("assembly failed");
    let mut ctx = Context::new(&image);
    ctx.evaluate().expect("evaluation failed")
}

#[test]
fn add_two_constants() {
    assert_eq!(run("push 3\npush 4\nadd\nquit"), 7);
}

#[test]
fn heap_round_trip() {
    assert_eq!(run("push ff\nstore 1 100\nload 1 100\nquit"), 0xFF);
}

#[test]
fn conditional_jump_not_taken() {
    assert_eq!(run("push 0\njmpez 10\npush 2a\nquit"), 42);
}

#[test]
fn call_and_return_via_labels() {
    let source = "0: push 5\ncalli 20\nquit\n20: push 6\nadd\nret";
    assert_eq!(run(source), 11);
}

#[test]
fn shift_count_is_masked() {
    assert_eq!(run("push 1\npush 41\nshl\nquit"), 2);
}

#[test]
fn lazy_heap_growth_on_zero_write() {
    let mut ctx = Context::new(&[]);
    ctx.heap_set(0xFFFF, 0).unwrap();
    assert_eq!(ctx.heap_get(0xFFFF), 0);
}
