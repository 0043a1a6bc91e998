//! Placement policy: best-fit search, splitting, top-block expansion.

use crate::align::align_up;
use crate::block::{BlockMeta, Status, descriptor_stride};
use crate::heap;
use crate::list::BlockList;

/// Mapping threshold for `allocate`: any request whose total size
/// (descriptor + aligned payload) meets or exceeds this uses an anonymous
/// mapping instead of the heap.
pub const MMAP_THRESHOLD: usize = 128 * 1024;

/// Acquires a block of at least `requested` bytes, choosing between a
/// mapping and the heap per `threshold`, and returns it ALLOCATED (or
/// MAPPED). `preallocated` is the process's single-shot "heap touched yet"
/// flag.
pub fn acquire(
  list: &mut BlockList,
  preallocated: &mut bool,
  requested: usize,
  threshold: usize,
) -> *mut BlockMeta {
  let total = descriptor_stride() + align_up(requested);

  if total >= threshold {
    return acquire_mapped(list, requested, total);
  }

  if !*preallocated {
    heap::preallocate(list);
    *preallocated = true;
  }

  if let Some(block) = fit_existing(list, requested) {
    return block;
  }

  expand_heap(list, requested, total)
}

fn acquire_mapped(list: &mut BlockList, requested: usize, total: usize) -> *mut BlockMeta {
  let region = heap::map(total);
  let block = unsafe { BlockMeta::write_at(region, align_up(requested), Status::Mapped) };
  list.insert(block);
  block
}

/// Best-fit search plus split. Returns `Some` only on a hit; a split
/// remainder, if produced, is already FREE and already inserted (no
/// coalescing is needed since its neighbour (`b`) was just taken).
fn fit_existing(list: &mut BlockList, requested: usize) -> Option<*mut BlockMeta> {
  let b = list.find_best_fit(requested);
  if b.is_null() {
    return None;
  }

  list.split(b, requested);
  unsafe {
    (*b).status = Status::Allocated;
  }
  Some(b)
}

/// Top-expansion: grows the tail in place if it is FREE, otherwise appends
/// a brand-new descriptor at the tail.
fn expand_heap(list: &mut BlockList, requested: usize, total: usize) -> *mut BlockMeta {
  let wanted = align_up(requested);
  let tail = list.tail();

  let tail_is_free = !tail.is_null() && unsafe { (*tail).status == Status::Free };
  if tail_is_free {
    let tail_size = unsafe { align_up((*tail).size) };
    if wanted > tail_size {
      heap::grow_heap(wanted - tail_size);
    }
    unsafe {
      (*tail).size = wanted;
      (*tail).status = Status::Allocated;
    }
    return tail;
  }

  let region = heap::grow_heap(total);
  let block = unsafe { BlockMeta::write_at(region, wanted, Status::Allocated) };
  list.insert(block);
  block
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn small_request_preallocates_and_returns_allocated_block() {
    let mut list = BlockList::new();
    let mut preallocated = false;

    let block = acquire(&mut list, &mut preallocated, 100, MMAP_THRESHOLD);

    assert!(preallocated);
    unsafe {
      assert_eq!((*block).status, Status::Allocated);
      assert_eq!((*block).size, align_up(100));
    }
    assert_eq!(list.len(), 2); // the allocated block plus the FREE remainder
  }

  #[test]
  fn request_at_or_above_threshold_is_mapped() {
    let mut list = BlockList::new();
    let mut preallocated = false;

    let block = acquire(&mut list, &mut preallocated, 200_000, MMAP_THRESHOLD);

    assert!(!preallocated);
    unsafe {
      assert_eq!((*block).status, Status::Mapped);
    }
    assert_eq!(list.head(), block);
  }

  #[test]
  fn second_small_request_reuses_preallocated_free_space() {
    let mut list = BlockList::new();
    let mut preallocated = false;

    let a = acquire(&mut list, &mut preallocated, 1024, MMAP_THRESHOLD);
    let before_len = list.len();
    let b = acquire(&mut list, &mut preallocated, 1024, MMAP_THRESHOLD);

    assert_ne!(a, b);
    // still inside the same preallocation: no new sbrk-backed block needed
    assert!(list.len() <= before_len + 1);
  }

  #[test]
  fn expand_heap_grows_free_tail_in_place_instead_of_appending() {
    let mut list = BlockList::new();
    let mut preallocated = false;
    acquire(&mut list, &mut preallocated, 1024, MMAP_THRESHOLD);

    // The tail is now the FREE remainder of the preallocation. Request
    // something bigger than it, forcing grow-in-place rather than a new
    // heap-resident descriptor.
    let remainder_size = unsafe { (*list.tail()).size };
    let before_len = list.len();
    let big = acquire(
      &mut list,
      &mut preallocated,
      remainder_size + 4096,
      MMAP_THRESHOLD,
    );

    assert_eq!(list.tail(), big);
    assert_eq!(list.len(), before_len);
  }

  #[test]
  fn large_request_before_small_still_preallocates() {
    let mut list = BlockList::new();
    let mut preallocated = false;

    let mapped = acquire(&mut list, &mut preallocated, 200_000, MMAP_THRESHOLD);
    unsafe {
      assert_eq!((*mapped).status, Status::Mapped);
    }
    assert!(!preallocated);

    let small = acquire(&mut list, &mut preallocated, 100, MMAP_THRESHOLD);

    assert!(preallocated);
    unsafe {
      assert_eq!((*small).status, Status::Allocated);
    }
    // mapped block plus a full preallocation: the small request still split
    // a fresh 128 KiB region rather than falling through to a bare sbrk of
    // just the requested bytes.
    assert_eq!(list.len(), 3);
  }
}
