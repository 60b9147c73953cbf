use std::io::Read;

use seglloc::{SbrkHeap, SegregatedAllocator, print_alloc, program_break};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`
/// or `gdb` while the program break moves.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    program_break(),
  );
}

fn print_heap(heap: &SegregatedAllocator<SbrkHeap>) {
  for block in heap.blocks() {
    println!(
      "    {:#07x}  {:>6} bytes  {}",
      block.offset,
      block.size,
      if block.allocated { "allocated" } else { "free" }
    );
  }
}

fn main() {
  print_program_break("start");

  let mut heap = match SegregatedAllocator::init(SbrkHeap::new()) {
    Ok(heap) => heap,
    Err(err) => {
      eprintln!("cannot initialise heap: {err}");
      return;
    }
  };
  print_program_break("after init");
  print_heap(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Two allocations carved from the initial chunk.
  // --------------------------------------------------------------------
  let Some(a) = heap.allocate(100) else { return };
  print_alloc(100, a.as_ptr());
  let Some(b) = heap.allocate(200) else { return };
  print_alloc(200, b.as_ptr());
  print_heap(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Release the first one, then ask for less: the hole is reused.
  // --------------------------------------------------------------------
  unsafe { heap.release(a) };
  let Some(c) = heap.allocate(50) else { return };
  print_alloc(50, c.as_ptr());
  println!("[2] c reuses a's block? {}", if c == a { "Yes" } else { "No" });
  print_heap(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Grow b past the end of the chunk to force a heap extension.
  // --------------------------------------------------------------------
  let before = heap.extensions();
  let Some(b) = (unsafe { heap.resize(Some(b), 64 * 1024) }) else { return };
  print_alloc(64 * 1024, b.as_ptr());
  println!("[3] heap extensions: {} -> {}", before, heap.extensions());
  print_program_break("after large resize");
  print_heap(&heap);

  match heap.check() {
    Ok(()) => println!("\n[4] heap is consistent"),
    Err(err) => println!("\n[4] heap check failed: {err}"),
  }
}
