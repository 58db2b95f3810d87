use std::io::Read;

use blockalloc::{Allocator, ExplicitFit};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations move the break.
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
    unsafe { sbrk(0) },
  );
}

fn main() {
  let mut heap = Allocator::<ExplicitFit>::new().expect("sbrk should succeed for the initial chunk");

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate 100 bytes, write a byte pattern, inspect the heap.
    // --------------------------------------------------------------------
    println!("\n[1] alloc(100)");
    let first = heap.alloc(100);
    std::ptr::write_bytes(first, 0xAB, 100);
    println!("[1] first = {:?}", first);
    heap.check_heap(true);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate a second, smaller block right after it.
    // --------------------------------------------------------------------
    println!("\n[2] alloc(16)");
    let second = heap.alloc(16);
    println!("[2] second = {:?}", second);
    heap.check_heap(true);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the first block; the free index should pick it back up.
    // --------------------------------------------------------------------
    println!("\n[3] free(first)");
    heap.free(first);
    heap.check_heap(true);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Grow the second block via realloc, crossing into the freed space.
    // --------------------------------------------------------------------
    println!("\n[4] realloc(second, 300)");
    let grown = heap.realloc(second, 300);
    println!("[4] grown = {:?}", grown);
    let violations = heap.check_heap(true);
    println!("[4] violations = {:?}", violations);

    block_until_enter_pressed();

    heap.free(grown);
    print_program_break("end");
  }
}
