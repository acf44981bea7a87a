//! Stack growth for the recursive parser and evaluator.
//!
//! Both walk the program recursively, so nesting depth translates directly into
//! host stack depth. Deep inputs grow the stack on demand instead of overflowing it.

/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
