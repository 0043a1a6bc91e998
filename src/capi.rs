//! The public C-style entry points, forwarding sizes to the core engine.
//!
//! Deliberately thin: none of the invariants are proven here, only passed
//! through to [`crate::Allocator`]. A `thread_local!` `RefCell<Allocator>`
//! gives each thread one implicit instance, lazily built on first use, with
//! no `unsafe static` and no cross-thread sharing (this crate makes no
//! concurrency guarantees; see the crate-level docs).

use std::cell::RefCell;
use std::ffi::c_void;

use crate::Allocator;

thread_local! {
  static ALLOCATOR: RefCell<Allocator> = RefCell::new(Allocator::new());
}

/// C-ABI equivalent of `allocate`.
///
/// # Safety
/// Same contract as `malloc`: the returned pointer, if non-null, must
/// eventually be passed to [`os_free`] exactly once and not used afterward.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn os_malloc(size: libc::size_t) -> *mut c_void {
  ALLOCATOR.with(|a| a.borrow_mut().allocate(size) as *mut c_void)
}

/// C-ABI equivalent of `allocate_zeroed`.
///
/// # Safety
/// Same contract as `calloc`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn os_calloc(nmemb: libc::size_t, size: libc::size_t) -> *mut c_void {
  ALLOCATOR.with(|a| a.borrow_mut().allocate_zeroed(nmemb, size) as *mut c_void)
}

/// C-ABI equivalent of `free`.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by [`os_malloc`],
/// [`os_calloc`] or [`os_realloc`] on the calling thread, not already freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn os_free(ptr: *mut c_void) {
  ALLOCATOR.with(|a| a.borrow_mut().free(ptr as *mut u8));
}

/// C-ABI equivalent of `reallocate`.
///
/// # Safety
/// Same contract as `realloc`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn os_realloc(ptr: *mut c_void, size: libc::size_t) -> *mut c_void {
  ALLOCATOR.with(|a| a.borrow_mut().reallocate(ptr as *mut u8, size) as *mut c_void)
}
