use blockalloc::{Allocator, ExplicitFit, SegregatedFit};

fn assert_clean<S: blockalloc::FreeIndex>(heap: &Allocator<S>) {
  let violations = heap.check_heap(false);
  assert!(violations.is_empty(), "unexpected heap violations: {violations:?}");
}

#[test]
fn single_alloc_then_free_restores_one_free_block() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(24);
  assert!(!p.is_null());
  assert_clean(&heap);
  unsafe { heap.free(p) };
  assert_clean(&heap);
}

#[test]
fn freeing_in_reverse_order_coalesces_neighbors() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let a = heap.alloc(16);
  let b = heap.alloc(16);
  let c = heap.alloc(16);
  assert!(![a, b, c].iter().any(|p| p.is_null()));

  unsafe {
    heap.free(b);
    assert_clean(&heap);
    heap.free(a);
    assert_clean(&heap);
    heap.free(c);
  }
  assert_clean(&heap);
}

#[test]
fn large_block_freed_then_reused_by_tail_placement() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let a = heap.alloc(2000);
  let b = heap.alloc(2000);
  assert!(!a.is_null() && !b.is_null());

  unsafe { heap.free(a) };
  assert_clean(&heap);

  let c = heap.alloc(1500);
  assert!(!c.is_null());
  assert_clean(&heap);

  unsafe {
    std::ptr::write_bytes(b, 0x42, 2000);
    let check = std::slice::from_raw_parts(b, 2000);
    assert!(check.iter().all(|&byte| byte == 0x42));
  }
}

#[test]
fn realloc_grows_in_place_into_following_free_block() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(100);
  unsafe {
    std::ptr::write_bytes(p, b'A', 100);
    let q = heap.realloc(p, 200);
    assert!(!q.is_null());
    let preserved = std::slice::from_raw_parts(q, 100);
    assert!(preserved.iter().all(|&b| b == b'A'));
  }
  assert_clean(&heap);
}

#[test]
fn freeing_a_full_chunk_lets_next_alloc_reuse_it_without_growing() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(4096);
  assert!(!p.is_null());
  unsafe { heap.free(p) };
  assert_clean(&heap);
  let q = heap.alloc(4096);
  assert!(!q.is_null());
  assert_clean(&heap);
}

#[test]
fn round_trip_write_read_survives_free_of_neighbors() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let pattern: Vec<u8> = (0..64).collect();
  let p = heap.alloc(64);
  unsafe {
    std::ptr::copy_nonoverlapping(pattern.as_ptr(), p, pattern.len());
    let readback = std::slice::from_raw_parts(p, pattern.len());
    assert_eq!(readback, pattern.as_slice());
    heap.free(p);
  }
}

#[test]
fn idempotent_resize_returns_same_pointer() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(40);
  unsafe {
    let q = heap.realloc(p, 40);
    assert_eq!(p, q);
  }
}

#[test]
fn realloc_to_zero_frees_and_returns_null() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(40);
  unsafe {
    let q = heap.realloc(p, 0);
    assert!(q.is_null());
  }
  assert_clean(&heap);
}

#[test]
fn segregated_allocations_across_every_bucket_are_tracked_without_orphans() {
  let mut heap = Allocator::<SegregatedFit>::new().unwrap();
  let mut ptrs = Vec::new();
  for i in 0..9u32 {
    let size = 1usize << (i + 5);
    let p = heap.alloc(size);
    assert!(!p.is_null(), "allocation of {size} bytes failed");
    ptrs.push(p);
  }
  assert_clean(&heap);

  for p in ptrs {
    unsafe { heap.free(p) };
  }
  assert_clean(&heap);
}

#[test]
fn alloc_of_zero_returns_null_and_touches_nothing() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let before = heap.check_heap(false);
  assert!(heap.alloc(0).is_null());
  let after = heap.check_heap(false);
  assert_eq!(before, after);
}

#[test]
fn small_allocation_rounds_up_to_minimum_block() {
  let mut heap = Allocator::<ExplicitFit>::new().unwrap();
  let p = heap.alloc(1);
  assert!(!p.is_null());
  assert_clean(&heap);
}

#[test]
fn both_strategies_agree_on_a_shared_scenario() {
  fn run<S: blockalloc::FreeIndex>() {
    let mut heap = Allocator::<S>::new().unwrap();
    let a = heap.alloc(48);
    let b = heap.alloc(48);
    unsafe {
      heap.free(a);
      let c = heap.alloc(32);
      assert!(!c.is_null());
      heap.free(b);
      heap.free(c);
    }
    assert_clean(&heap);
  }

  run::<ExplicitFit>();
  run::<SegregatedFit>();
}
