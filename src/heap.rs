//! Heap-growth primitive: wraps program-break movement and anonymous
//! mappings.

use std::ffi::c_void;

use libc::{MAP_ANONYMOUS, MAP_PRIVATE, PROT_READ, PROT_WRITE, intptr_t, sbrk};

use crate::block::{BlockMeta, Status, descriptor_stride};
use crate::list::BlockList;

/// One-shot heap preallocation size: the first small allocation in the
/// process preallocates this much via [`grow_heap`], so the free list has
/// inventory before the first real request is served.
pub const PREALLOCATION_SIZE: usize = 128 * 1024;

/// Moves the program break by `delta` bytes and returns the address of the
/// newly added region (the pre-adjustment break). Aborts the process on
/// failure, since with no backing memory available there is nothing a
/// caller could do with a partial result.
pub fn grow_heap(delta: usize) -> *mut u8 {
  let result = unsafe { sbrk(delta as intptr_t) };
  if result == usize::MAX as *mut c_void {
    crate::fatal::die("sbrk failed to extend the program break");
  }
  result as *mut u8
}

/// Preallocates [`PREALLOCATION_SIZE`] bytes of heap, places one FREE
/// descriptor covering it, and inserts it into `list`. Called exactly once
/// per process, the first time a heap-resident (non-mapped) allocation is
/// requested.
pub fn preallocate(list: &mut BlockList) {
  let region = grow_heap(PREALLOCATION_SIZE);
  let size = PREALLOCATION_SIZE - descriptor_stride();
  let block = unsafe { BlockMeta::write_at(region, size, Status::Free) };
  list.insert(block);
}

/// Requests an anonymous, private, zero-initialised mapping of `size` bytes.
/// Aborts on failure, for the same reason `grow_heap` does.
pub fn map(size: usize) -> *mut u8 {
  let addr = unsafe {
    libc::mmap(
      std::ptr::null_mut(),
      size,
      PROT_READ | PROT_WRITE,
      MAP_PRIVATE | MAP_ANONYMOUS,
      -1,
      0,
    )
  };
  if addr == libc::MAP_FAILED {
    crate::fatal::die("mmap failed to acquire an anonymous mapping");
  }
  addr as *mut u8
}

/// Releases a previously mapped `(addr, size)` region. Aborts on failure:
/// a botched `munmap` means the address space bookkeeping can no longer be
/// trusted.
pub fn unmap(addr: *mut u8, size: usize) {
  let result = unsafe { libc::munmap(addr as *mut c_void, size) };
  if result < 0 {
    crate::fatal::die("munmap failed to release a mapped block");
  }
}

/// System page size, consumed by the placement policy's `allocate_zeroed`
/// threshold.
pub fn page_size() -> usize {
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}
