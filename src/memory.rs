// C1: memory primitives.
//
// Grown-zeroed buffer reallocation, the saturating-doubling growth rule and
// the bounded integer arithmetic every other component funnels through, plus
// the file-slurp helper the driver uses to read a program off a reader.
//
// Grounded in `original_source/src/avm_util.c` (`my_crealloc`, `min`,
// `read_file`) and `avm.c`'s `asizet_add_bounds_check`/growth call sites.

use crate::error::CoreError;
use std::io::Read;

/// The largest valid address/length value; addresses, stack and call-stack
/// indices all share this ceiling.
pub const ADDR_MAX: u32 = u32::MAX;

/// `true` iff `a + b` would overflow `ADDR_MAX` (not merely `u32::MAX` —
/// they are the same value here, but the name documents which ceiling is
/// being enforced). Matches the corrected `asizet_add_bounds_check`: reject
/// equality at the boundary, i.e. `a + b > ADDR_MAX`.
pub fn add_overflow_check(a: u32, b: u32) -> bool {
    match a.checked_add(b) {
        Some(sum) => sum > ADDR_MAX,
        None => true,
    }
}

/// Capacity growth by a factor of two, clamped at `ADDR_MAX`.
pub fn saturating_double(n: u32) -> u32 {
    n.checked_mul(2).map_or(ADDR_MAX, |doubled| doubled.min(ADDR_MAX))
}

/// Grow `buf` to `new_len` elements in place, preserving existing contents
/// and zero-filling the new tail. Fails with `CoreError::AllocFailed` if the
/// allocator can't satisfy the request — the safe-Rust analogue of
/// `my_crealloc` returning `NULL`.
pub fn grow_zeroed<T: Copy + Default>(
    buf: &mut Vec<T>,
    new_len: usize,
    what: &'static str,
) -> Result<(), CoreError> {
    if new_len <= buf.len() {
        return Ok(());
    }
    let additional = new_len - buf.len();
    buf.try_reserve_exact(additional).map_err(|_| CoreError::AllocFailed {
        what,
        elements: new_len as u64,
    })?;
    buf.resize(new_len, T::default());
    Ok(())
}

/// Reads a reader to exhaustion and returns its bytes. The driver uses this
/// to slurp the program image off standard input.
pub fn read_all<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_overflow_check_rejects_exact_boundary() {
        assert!(add_overflow_check(ADDR_MAX, 1));
        assert!(!add_overflow_check(ADDR_MAX, 0)); // equality is fine
        assert!(!add_overflow_check(0, ADDR_MAX));
    }

    #[test]
    fn saturating_double_clamps() {
        assert_eq!(saturating_double(4096), 8192);
        assert_eq!(saturating_double(ADDR_MAX), ADDR_MAX);
        assert_eq!(saturating_double(ADDR_MAX / 2 + 1), ADDR_MAX);
    }

    #[test]
    fn grow_zeroed_preserves_and_zero_fills() {
        let mut buf = vec![1u64, 2, 3];
        grow_zeroed(&mut buf, 6, "test").unwrap();
        assert_eq!(buf, vec![1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn grow_zeroed_no_op_when_already_big_enough() {
        let mut buf = vec![7u64; 10];
        grow_zeroed(&mut buf, 4, "test").unwrap();
        assert_eq!(buf.len(), 10);
    }
}
