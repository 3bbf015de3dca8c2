//! Translation Layer Tests.
//!
//! Drives `Mmu` against the scripted collaborator from `common::mocks` and
//! checks both the values returned and which path served them:
//! - Allocation and free keep the TLB in step with the region registers
//! - Hits are served from the TLB-backed bank without the collaborator
//! - Misses go through the collaborator and refill the TLB
//! - Errors are propagated unchanged and leave the TLB alone

use pretty_assertions::assert_eq;
use tlbsim_core::common::PhysAddr;
use tlbsim_core::core::units::mmu::ptw::PageTableEntry;
use tlbsim_core::{MemError, MemPhy, Mmu, Process};

use crate::common::harness::mock_process;
use crate::common::mocks::vm::{Calls, MockHandle, MockVm};

const FIRST_FRAME: u32 = 5;

fn setup() -> (Mmu, Process, MockHandle) {
    let mmu = Mmu::new(64).unwrap();
    let (proc, vm) = mock_process(1, FIRST_FRAME);
    (mmu, proc, vm)
}

// ══════════════════════════════════════════════════════════
// 1. Allocation and Free
// ══════════════════════════════════════════════════════════

#[test]
fn alloc_caches_first_page() {
    let (mmu, mut proc, vm) = setup();
    let base = mmu.alloc(&mut proc, 40, 0).unwrap();

    assert_eq!(base.val(), 0);
    assert_eq!(proc.region_base(0), Ok(base));
    assert_eq!(mmu.tlb().lookup(1, 0), Some(u64::from(FIRST_FRAME)));
    assert_eq!(mmu.tlb().len(), 1);
    assert_eq!(vm.calls().allocs, 1);
}

#[test]
fn alloc_only_caches_first_page_of_large_region() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 3 * 4096, 0).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));
    assert_eq!(mmu.tlb().lookup(1, 1), None);
    assert_eq!(mmu.tlb().lookup(1, 2), None);
}

#[test]
fn alloc_failure_leaves_tlb_untouched() {
    let (mmu, mut proc, vm) = setup();
    vm.fail_next_alloc();

    let err = mmu.alloc(&mut proc, 40, 0).unwrap_err();
    assert_eq!(err, MemError::AllocationFailed { size: 40 });
    assert!(mmu.tlb().is_empty());
    assert_eq!(proc.region_base(0), Err(MemError::RegionNotAllocated(0)));
}

#[test]
fn alloc_into_bad_region_never_reaches_collaborator() {
    let (mmu, mut proc, vm) = setup();
    let regions = proc.region_count();
    let err = mmu.alloc(&mut proc, 40, regions).unwrap_err();
    assert_eq!(err, MemError::InvalidRegion(10));
    assert_eq!(vm.calls(), Calls::default());
}

#[test]
fn free_removes_cached_entry() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    mmu.free(&mut proc, 0).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 0), None);
    assert_eq!(proc.region_base(0), Err(MemError::RegionNotAllocated(0)));
    assert_eq!(vm.calls().frees, 1);
}

#[test]
fn free_removes_every_page_of_the_region() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 3 * 4096, 0).unwrap();
    for vpn in 1..3 {
        mmu.tlb().insert(1, vpn, 5 + vpn).unwrap();
    }

    mmu.free(&mut proc, 0).unwrap();
    assert!(mmu.tlb().is_empty());
}

#[test]
fn free_of_unallocated_region_fails_and_keeps_cache() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    let err = mmu.free(&mut proc, 3).unwrap_err();
    assert_eq!(err, MemError::RegionNotAllocated(3));
    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));
}

#[test]
fn free_leaves_other_processes_alone() {
    let mmu = Mmu::new(64).unwrap();
    let (mut a, _va) = mock_process(1, 5);
    let (mut b, _vb) = mock_process(2, 30);
    let _ = mmu.alloc(&mut a, 40, 0).unwrap();
    let _ = mmu.alloc(&mut b, 40, 0).unwrap();

    mmu.free(&mut a, 0).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 0), None);
    assert_eq!(mmu.tlb().lookup(2, 0), Some(30));
}

// ══════════════════════════════════════════════════════════
// 2. Write then Read
// ══════════════════════════════════════════════════════════

#[test]
fn write_miss_refills_then_read_hits() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
    let _ = mmu.tlb().remove(1, 0);

    mmu.write(&mut proc, 0x41, 0, 10).unwrap();
    assert_eq!(vm.calls().writes, 1);
    assert_eq!(vm.byte_at(5 * 4096 + 10), 0x41);
    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));

    assert_eq!(mmu.read(&mut proc, 0, 10), Ok(0x41));
    assert_eq!(vm.calls().reads, 0);

    let stats = mmu.stats();
    assert_eq!(stats.write_misses, 1);
    assert_eq!(stats.read_hits, 1);
}

#[test]
fn write_hit_lands_in_bank_and_collaborator() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    mmu.write(&mut proc, 0x7f, 0, 3).unwrap();
    assert_eq!(mmu.stats().write_hits, 1);
    assert_eq!(
        proc.tlb_memory().read(PhysAddr::from_frame(5, 3)),
        Ok(0x7f)
    );
    assert_eq!(vm.byte_at(5 * 4096 + 3), 0x7f);
}

#[test]
fn write_hit_corrects_stale_frame() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
    vm.remap(0, PageTableEntry::present(9));

    mmu.write(&mut proc, 0x33, 0, 1).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 0), Some(9));
    assert_eq!(vm.byte_at(9 * 4096 + 1), 0x33);
    assert_eq!(mmu.read(&mut proc, 0, 1), Ok(0x33));
}

// ══════════════════════════════════════════════════════════
// 3. Read Paths
// ══════════════════════════════════════════════════════════

#[test]
fn read_hit_never_touches_collaborator() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    for offset in 0..8 {
        assert_eq!(mmu.read(&mut proc, 0, offset), Ok(0));
    }
    assert_eq!(vm.calls().reads, 0);
    assert_eq!(mmu.stats().read_hits, 8);
}

#[test]
fn read_miss_goes_through_collaborator_and_mirrors() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
    let _ = mmu.tlb().remove(1, 0);
    vm.poke(5 * 4096 + 10, 0x41);

    assert_eq!(mmu.read(&mut proc, 0, 10), Ok(0x41));
    assert_eq!(vm.calls().reads, 1);
    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));
    assert_eq!(
        proc.tlb_memory().read(PhysAddr::from_frame(5, 10)),
        Ok(0x41)
    );

    assert_eq!(mmu.read(&mut proc, 0, 10), Ok(0x41));
    assert_eq!(vm.calls().reads, 1);
}

#[test]
fn miss_on_unseen_page_converges() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 2 * 4096, 0).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 1), None);

    let _ = mmu.read(&mut proc, 0, 4096 + 5).unwrap();
    assert_eq!(mmu.tlb().lookup(1, 1), Some(6));
    assert_eq!(mmu.stats().read_misses, 1);
}

#[test]
fn access_to_unallocated_region_fails() {
    let (mmu, mut proc, vm) = setup();
    assert_eq!(
        mmu.read(&mut proc, 2, 0),
        Err(MemError::RegionNotAllocated(2))
    );
    assert_eq!(
        mmu.write(&mut proc, 1, 2, 0),
        Err(MemError::RegionNotAllocated(2))
    );
    assert_eq!(mmu.read(&mut proc, 10, 0), Err(MemError::InvalidRegion(10)));
    assert_eq!(vm.calls(), Calls::default());
}

#[test]
fn collaborator_fault_is_propagated_without_refill() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    assert_eq!(
        mmu.write(&mut proc, 1, 0, 2 * 4096),
        Err(MemError::PageFault(0x2000))
    );
    assert_eq!(mmu.tlb().lookup(1, 2), None);
}

#[test]
fn offset_overflow_is_reported() {
    let (mmu, mut proc, _vm) = setup();
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
    let base = mmu.alloc(&mut proc, 40, 1).unwrap();
    assert_eq!(base.val(), 0x1000);

    assert_eq!(
        mmu.read(&mut proc, 1, u64::MAX),
        Err(MemError::AddressOverflow {
            base: 0x1000,
            offset: u64::MAX
        })
    );
}

#[test]
fn bank_bounds_error_is_surfaced_on_hit() {
    let mmu = Mmu::new(8).unwrap();
    let (vm, _handle) = MockVm::new(5);
    let mut proc = Process::new(1, 10, Box::new(vm), MemPhy::new(16).unwrap());
    let _ = mmu.alloc(&mut proc, 40, 0).unwrap();

    assert_eq!(
        mmu.read(&mut proc, 0, 10),
        Err(MemError::OutOfBounds {
            addr: 5 * 4096 + 10,
            size: 16
        })
    );
}

// ══════════════════════════════════════════════════════════
// 4. Capacity on Refill
// ══════════════════════════════════════════════════════════

#[test]
fn full_table_drops_refill_but_access_succeeds() {
    let mmu = Mmu::new(1).unwrap();
    let (mut a, _va) = mock_process(1, 5);
    let (mut b, vb) = mock_process(2, 30);
    let _ = mmu.alloc(&mut a, 40, 0).unwrap();

    let base = mmu.alloc(&mut b, 40, 0).unwrap();
    assert_eq!(base.val(), 0);
    assert_eq!(mmu.tlb().lookup(2, 0), None);
    assert_eq!(mmu.stats().refills_dropped, 1);

    mmu.write(&mut b, 0x12, 0, 4).unwrap();
    assert_eq!(mmu.read(&mut b, 0, 4), Ok(0x12));
    assert_eq!(vb.calls().reads, 1);
    assert_eq!(mmu.tlb().len(), 1);
}

#[test]
fn zero_sized_tlb_is_rejected() {
    assert_eq!(Mmu::new(0).unwrap_err(), MemError::InvalidCapacity);
}

// ══════════════════════════════════════════════════════════
// 5. Resync and Release
// ══════════════════════════════════════════════════════════

#[test]
fn resync_drops_unmapped_and_corrects_moved_pages() {
    let (mmu, mut proc, vm) = setup();
    let _ = mmu.alloc(&mut proc, 3 * 4096, 0).unwrap();
    mmu.tlb().insert(1, 1, 6).unwrap();
    mmu.tlb().insert(1, 2, 7).unwrap();

    vm.remap(1, PageTableEntry::present(20));
    vm.remap(2, PageTableEntry::INVALID);

    assert_eq!(mmu.resync(&proc), 2);
    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));
    assert_eq!(mmu.tlb().lookup(1, 1), Some(20));
    assert_eq!(mmu.tlb().lookup(1, 2), None);
    assert_eq!(mmu.stats().resync_changes, 2);

    assert_eq!(mmu.resync(&proc), 0);
}

#[test]
fn release_flushes_only_the_exiting_process() {
    let mmu = Mmu::new(64).unwrap();
    let (mut a, _va) = mock_process(1, 5);
    let (mut b, _vb) = mock_process(2, 30);
    let _ = mmu.alloc(&mut a, 40, 0).unwrap();
    let _ = mmu.alloc(&mut a, 40, 1).unwrap();
    let _ = mmu.alloc(&mut b, 40, 0).unwrap();

    assert_eq!(mmu.release(&a), 2);
    assert!(mmu.tlb().entries_of(1).is_empty());
    assert_eq!(mmu.tlb().lookup(2, 0), Some(30));
}

#[test]
fn clones_share_table_and_stats() {
    let (mmu, mut proc, _vm) = setup();
    let other = mmu.clone();
    let _ = other.alloc(&mut proc, 40, 0).unwrap();
    let _ = other.read(&mut proc, 0, 0).unwrap();

    assert_eq!(mmu.tlb().lookup(1, 0), Some(5));
    assert_eq!(mmu.stats().read_hits, 1);
}

#[test]
fn trace_dumps_do_not_change_results() {
    let mut config = tlbsim_core::Config::default();
    config.general.trace_dumps = true;
    config.tlb.max_entries = 8;
    let mmu = Mmu::from_config(&config).unwrap();
    let (mut proc, _vm) = mock_process(1, FIRST_FRAME);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
        mmu.write(&mut proc, 0x41, 0, 10).unwrap();
        assert_eq!(mmu.read(&mut proc, 0, 10), Ok(0x41));
    });
    assert_eq!(mmu.stats().hits(), 2);
}
