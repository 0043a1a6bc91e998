//! The allocator façade: the four public operations composed from the block
//! list, heap-growth primitive, placement policy and coalescing.

use std::ptr;

use crate::align::align_up;
use crate::block::{BlockMeta, Status, descriptor_stride};
use crate::coalesce::join;
use crate::heap;
use crate::list::BlockList;
use crate::policy::{self, MMAP_THRESHOLD};

/// The process-wide allocator state: one block list plus the single-shot
/// "heap preallocated" flag. Directly constructible so tests can
/// reset state deterministically; see [`crate::capi`] for the thread-local
/// singleton the `extern "C"` shim uses.
pub struct Allocator {
  list: BlockList,
  preallocated: bool,
}

impl Allocator {
  pub const fn new() -> Self {
    Self {
      list: BlockList::new(),
      preallocated: false,
    }
  }

  /// Number of descriptors currently tracked (live and free). Exposed for
  /// tests that assert on block-list shape.
  pub fn block_count(&self) -> usize {
    self.list.len()
  }

  /// Head of the block list. Exposed only for invariant-checking tests that
  /// need to walk every descriptor.
  #[cfg(test)]
  pub fn list_head_for_test(&self) -> *mut BlockMeta {
    self.list.head()
  }

  /// Allocates `size` bytes, returning a payload pointer or null for `size
  /// == 0` or OS failure (OS failure aborts the process rather than
  /// returning null; see `heap::grow_heap`/`heap::map`).
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let block = policy::acquire(&mut self.list, &mut self.preallocated, size, MMAP_THRESHOLD);
    BlockMeta::payload(block)
  }

  /// Allocates space for `count` elements of `size` bytes each, zeroed. Uses
  /// the system page size as the mapping threshold so large zero-fills ride
  /// on pre-zeroed mapped pages instead of an explicit write loop.
  pub fn allocate_zeroed(&mut self, count: usize, size: usize) -> *mut u8 {
    if count == 0 || size == 0 {
      return ptr::null_mut();
    }

    let Some(total) = count.checked_mul(size) else {
      return ptr::null_mut();
    };

    let threshold = heap::page_size();
    let block = policy::acquire(&mut self.list, &mut self.preallocated, total, threshold);
    let payload = BlockMeta::payload(block);
    unsafe {
      ptr::write_bytes(payload, 0, total);
    }
    payload
  }

  /// Frees a payload pointer previously returned by `allocate`/
  /// `allocate_zeroed`/`reallocate`. Null is a no-op.
  pub fn free(&mut self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }

    let block = unsafe { BlockMeta::from_payload(ptr) };
    unsafe {
      if (*block).status == Status::Mapped {
        let total = descriptor_stride() + align_up((*block).size);
        self.list.remove(block);
        heap::unmap(block as *mut u8, total);
      } else {
        (*block).status = Status::Free;
        join(&mut self.list, block, true);
      }
    }
  }

  /// Reallocates a payload pointer to `size` bytes, handling the null-pointer
  /// and zero-size boundary cases directly. Returns null only for the
  /// `(null, 0)` and `(p, FREE-block)` cases; OS failure aborts, matching
  /// `allocate`.
  pub fn reallocate(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
    if ptr.is_null() {
      if size == 0 {
        return ptr::null_mut();
      }
      return self.allocate(size);
    }

    if size == 0 {
      self.free(ptr);
      return ptr::null_mut();
    }

    let block = unsafe { BlockMeta::from_payload(ptr) };
    let status = unsafe { (*block).status };

    if status == Status::Free {
      return ptr::null_mut();
    }

    let new_total = descriptor_stride() + align_up(size);
    if status == Status::Mapped || new_total >= MMAP_THRESHOLD {
      return self.reallocate_by_copy(ptr, block, size);
    }

    self.reallocate_in_place(block, size).unwrap_or_else(|| self.reallocate_by_copy(ptr, block, size))
  }

  /// In-place path: refit (grow the tail) if possible, otherwise shrink via
  /// split, otherwise coalesce forward and retry the fit once.
  fn reallocate_in_place(&mut self, block: *mut BlockMeta, size: usize) -> Option<*mut u8> {
    let wanted = align_up(size);

    if self.refit(block, wanted) {
      unsafe {
        (*block).status = Status::Allocated;
      }
      return Some(BlockMeta::payload(block));
    }

    if wanted <= unsafe { align_up((*block).size) } {
      unsafe {
        (*block).status = Status::Allocated;
      }
      if let Some(remainder) = self.list.split(block, size) {
        join(&mut self.list, remainder, false);
      }
      return Some(BlockMeta::payload(block));
    }

    let survivor = join(&mut self.list, block, false);
    unsafe {
      (*survivor).status = Status::Allocated;
    }
    if wanted <= unsafe { align_up((*survivor).size) } {
      if let Some(remainder) = self.list.split(survivor, size) {
        join(&mut self.list, remainder, false);
      }
      return Some(BlockMeta::payload(survivor));
    }

    None
  }

  /// In-place grow when `block` is the tail: expands the program break and
  /// grows `block` to `wanted` bytes. Returns `false` (no state change) if
  /// `block` isn't the tail or is already large enough.
  fn refit(&mut self, block: *mut BlockMeta, wanted: usize) -> bool {
    if block != self.list.tail() {
      return false;
    }

    let current = unsafe { align_up((*block).size) };
    if wanted <= current {
      return false;
    }

    heap::grow_heap(wanted - current);
    unsafe {
      (*block).size = wanted;
    }
    true
  }

  fn reallocate_by_copy(&mut self, ptr: *mut u8, block: *mut BlockMeta, size: usize) -> *mut u8 {
    let old_size = unsafe { align_up((*block).size) };
    let new_ptr = self.allocate(size);
    let copy_size = old_size.min(align_up(size));
    unsafe {
      ptr::copy_nonoverlapping(ptr, new_ptr, copy_size);
    }
    self.free(ptr);
    new_ptr
  }
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}
