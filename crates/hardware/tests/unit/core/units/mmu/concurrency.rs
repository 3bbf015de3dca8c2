//! Concurrency Tests.
//!
//! Several threads share one TLB, either directly or through cloned `Mmu`
//! handles. Every thread must observe its own translations and values, and the
//! table must never hold duplicate keys or exceed its capacity.

use std::sync::Arc;
use std::thread;

use tlbsim_core::TlbCache;

use crate::common::harness::{mock_process, small_machine};

const THREADS: u32 = 8;

#[test]
fn disjoint_inserts_from_many_threads() {
    let tlb = Arc::new(TlbCache::new(1024).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|pid| {
            let tlb = Arc::clone(&tlb);
            thread::spawn(move || {
                for vpn in 0..64 {
                    tlb.insert(pid, vpn, u64::from(pid) * 100 + vpn).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(tlb.len(), THREADS as usize * 64);
    for pid in 0..THREADS {
        for vpn in 0..64 {
            assert_eq!(tlb.lookup(pid, vpn), Some(u64::from(pid) * 100 + vpn));
        }
    }
}

#[test]
fn racing_inserts_on_one_key_leave_one_entry() {
    let tlb = Arc::new(TlbCache::new(4).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let tlb = Arc::clone(&tlb);
            thread::spawn(move || {
                for _ in 0..200 {
                    tlb.insert(1, 0, u64::from(t)).unwrap();
                    let _ = tlb.lookup(1, 0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(tlb.len(), 1);
    let fpn = tlb.lookup(1, 0).unwrap();
    assert!(fpn < u64::from(THREADS));
}

#[test]
fn contention_never_exceeds_capacity() {
    let tlb = Arc::new(TlbCache::new(16).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|pid| {
            let tlb = Arc::clone(&tlb);
            thread::spawn(move || {
                let mut rejected = 0;
                for vpn in 0..32 {
                    if tlb.insert(pid, vpn, vpn).is_err() {
                        rejected += 1;
                    }
                    if vpn % 4 == 0 {
                        let _ = tlb.remove(pid, vpn / 2);
                    }
                }
                rejected
            })
        })
        .collect();
    let rejected: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert!(rejected > 0);
    assert!(tlb.len() <= 16);
}

#[test]
fn processes_on_cloned_mmus_see_their_own_data() {
    let machine = small_machine(256);
    let handles: Vec<_> = (1..=THREADS)
        .map(|pid| {
            let mmu = machine.mmu().clone();
            let mut proc = machine.spawn(pid).unwrap();
            thread::spawn(move || {
                let _ = mmu.alloc(&mut proc, 2 * 4096, 0).unwrap();
                for offset in (0..2 * 4096).step_by(512) {
                    mmu.write(&mut proc, pid as u8, 0, offset).unwrap();
                }
                for offset in (0..2 * 4096).step_by(512) {
                    assert_eq!(mmu.read(&mut proc, 0, offset), Ok(pid as u8));
                }
                let cached = mmu.tlb().entries_of(pid).len();
                assert_eq!(mmu.release(&proc), cached);
                proc
            })
        })
        .collect();
    let procs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(machine.mmu().tlb().is_empty());
    let stats = machine.mmu().stats();
    assert_eq!(stats.hits() + stats.misses(), u64::from(THREADS) * 32);
    drop(procs);
}

#[test]
fn mock_processes_share_one_table() {
    let mmu = tlbsim_core::Mmu::new(64).unwrap();
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let mmu = mmu.clone();
            let (mut proc, _vm) = mock_process(i + 1, i * 10);
            thread::spawn(move || {
                let _ = mmu.alloc(&mut proc, 40, 0).unwrap();
                mmu.write(&mut proc, 0x41, 0, 10).unwrap();
                mmu.read(&mut proc, 0, 10).unwrap()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 0x41);
    }

    for i in 0..4u32 {
        assert_eq!(mmu.tlb().lookup(i + 1, 0), Some(u64::from(i * 10)));
    }
}
