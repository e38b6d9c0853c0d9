mod common;

use common::{Arena, PAGE, TestPool, pool};
use kernel_pmm::{FramePool, PoolPhase};

#[test]
fn phases_advance_in_order() {
    let arena = Arena::new(8);
    let pool = pool(&arena, 0);
    assert_eq!(pool.phase(), PoolPhase::Uninitialized);
    assert_eq!(pool.free_page_count(), 0);

    let added = unsafe { pool.init_bootstrap(arena.va(0), arena.va(3)) };
    assert_eq!(added, 3);
    assert_eq!(pool.phase(), PoolPhase::Bootstrap);
    assert_eq!(pool.free_page_count(), 3);

    let added = unsafe { pool.enable_locking(arena.va(3), arena.end()) };
    assert_eq!(added, 5);
    assert_eq!(pool.phase(), PoolPhase::Locked);
    assert_eq!(pool.free_page_count(), 8);
    assert_eq!(pool.check_invariants(), Ok(8));
}

#[test]
fn seeded_frames_have_zero_counts() {
    let arena = Arena::new(6);
    let pool = common::seeded_pool(&arena, 2);
    for n in 2..6 {
        assert_eq!(pool.refs().get(arena.pa(n)), 0);
    }
    assert_eq!(pool.free_page_count(), 4);
}

#[test]
fn bootstrap_allocation_works_without_locks() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe { pool.init_bootstrap(arena.va(0), arena.end()) };

    let frame = pool.allocate_frame().unwrap();
    assert_eq!(pool.phase(), PoolPhase::Bootstrap);
    assert_eq!(pool.free_page_count(), 3);
    assert_eq!(pool.refs().get(arena.pa(arena.page_of(frame))), 1);

    unsafe { pool.free_frame(frame) };
    assert_eq!(pool.free_page_count(), 4);
    assert_eq!(pool.check_invariants(), Ok(4));
}

#[test]
fn range_start_is_rounded_up() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    // One byte into page 0: pages 1 and 2 fit, page 3 is cut off by `end`.
    let added = unsafe { pool.init_bootstrap(arena.va(0) + 1, arena.va(3) + 100) };
    assert_eq!(added, 2);
    assert_eq!(pool.free_page_count(), 2);
}

#[test]
fn partial_trailing_page_is_skipped() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    let added = unsafe { pool.init_bootstrap(arena.va(1), arena.va(2) + (PAGE - 1)) };
    assert_eq!(added, 1);
}

#[test]
fn empty_ranges_add_nothing() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe {
        assert_eq!(pool.init_bootstrap(arena.va(2), arena.va(2)), 0);
        assert_eq!(pool.enable_locking(arena.va(3), arena.va(1)), 0);
    }
    assert_eq!(pool.phase(), PoolPhase::Locked);
    assert_eq!(pool.free_page_count(), 0);
    assert!(pool.allocate_frame().is_err());
}

#[test]
#[should_panic(expected = "cannot enter Bootstrap")]
fn second_bootstrap_is_fatal() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe {
        pool.init_bootstrap(arena.va(0), arena.va(2));
        pool.init_bootstrap(arena.va(2), arena.end());
    }
}

#[test]
#[should_panic(expected = "kinit2: pool must be in bootstrap mode")]
fn locking_before_bootstrap_is_fatal() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe { pool.enable_locking(arena.va(0), arena.end()) };
}

#[test]
#[should_panic(expected = "kinit2: pool must be in bootstrap mode, found Locked")]
fn enabling_locking_twice_is_fatal() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe {
        pool.init_bootstrap(arena.va(0), arena.va(1));
        pool.enable_locking(arena.va(1), arena.va(2));
        pool.enable_locking(arena.va(2), arena.end());
    }
}

#[test]
#[should_panic(expected = "kinit1: reference table used before init")]
fn bootstrap_requires_initialized_refs() {
    let arena = Arena::new(4);
    let pool: TestPool = FramePool::new(arena.layout(0), arena.mapper());
    unsafe { pool.init_bootstrap(arena.va(0), arena.end()) };
}

#[test]
#[should_panic(expected = "kalloc: frame pool used before kinit1")]
fn allocating_from_uninitialized_pool_is_fatal() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    let _ = pool.allocate_frame();
}

#[test]
#[should_panic(expected = "kfree: frame pool used before kinit1")]
fn freeing_into_uninitialized_pool_is_fatal() {
    let arena = Arena::new(4);
    let pool = pool(&arena, 0);
    unsafe { pool.free_frame(arena.va(1)) };
}

#[test]
fn uninitialized_pool_audits_clean() {
    let arena = Arena::new(2);
    let pool = pool(&arena, 0);
    assert_eq!(pool.check_invariants(), Ok(0));
}

#[test]
#[should_panic(expected = "reference table does not cover")]
fn table_too_small_for_layout_is_fatal() {
    let arena = Arena::new(4);
    // 16 slots reach 0x10000, far below PHYS_BASE.
    let _pool: FramePool<_, 16> = FramePool::new(arena.layout(0), arena.mapper());
}
