//! The single fatal-diagnostic exit path (mirrors the original `DIE` macro).
//!
//! OS-resource exhaustion and internal invariant violations are not
//! recoverable at this layer: the caller cannot be handed a meaningful
//! result, and silently returning null would let a later `free`/`realloc`
//! corrupt the block list. Every such path funnels through [`die`].

/// Prints a one-line diagnostic to stderr and aborts the process.
///
/// Never returns. Kept as a single narrow function so there is exactly one
/// place deciding how a fatal diagnostic is formatted.
pub fn die(message: &str) -> ! {
  eprintln!("blockmem: fatal: {message}");
  std::process::abort();
}
