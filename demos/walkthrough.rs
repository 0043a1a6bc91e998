use std::io::Read;

use blockmem::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { libc::sbrk(0) },
  );
}

fn main() {
  let mut allocator = Allocator::new();

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) A small allocation triggers the one-shot 128 KiB preallocation.
    // --------------------------------------------------------------------
    let first = allocator.allocate(std::mem::size_of::<u32>());
    println!("\n[1] Allocate u32, payload = {:?}", first);
    (first as *mut u32).write(0xDEADBEEF);
    println!("[1] Value written = 0x{:X}", (first as *mut u32).read());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) A second small allocation is carved out of the preallocated
    //    remainder via best-fit + split, not a fresh sbrk call.
    // --------------------------------------------------------------------
    let second = allocator.allocate(12);
    println!("\n[2] Allocate [u8; 12], payload = {:?}", second);
    std::ptr::write_bytes(second, 0xAB, 12);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Freeing the first block marks it FREE; it does not coalesce with
    //    the second (allocated) block, but will with its own neighbours.
    // --------------------------------------------------------------------
    allocator.free(first);
    println!("\n[3] Freed first block at {:?}", first);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) A large (200 KiB) request crosses the mapping threshold and is
    //    served by an anonymous mapping instead of the heap.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");
    let big = allocator.allocate(200 * 1024);
    println!("\n[4] Allocate 200 KiB (mapped), payload = {:?}", big);
    print_program_break("after large alloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Growing `second` in place: since it's the heap's tail, this moves
    //    the program break rather than copying.
    // --------------------------------------------------------------------
    let grown = allocator.reallocate(second, 64 * 1024);
    println!(
      "\n[5] Reallocated second block to 64 KiB, same pointer? {}",
      grown == second
    );
    block_until_enter_pressed();

    allocator.free(grown);
    allocator.free(big);
    println!("\n[6] End of walkthrough. Process exit reclaims everything else.");
  }
}
