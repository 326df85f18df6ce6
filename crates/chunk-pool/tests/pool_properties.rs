//! 缓冲池性质验证
//!
//! - **核心目标 (Why)**：对任意“合法操作序列”检查两种策略的簿记不变量，避免只靠手写场景覆盖边角交错。
//! - **设计手法 (How)**：使用 Proptest 生成操作序列，并维护一个影子模型：
//!   - 回收池：影子模型记录每一份持有（同一缓冲可出现多次），断言“空闲 ⇔ 引用计数为 0”；
//!   - 有界池：影子模型只跟踪空闲数量、溢出与丢弃次数，断言与 `usage()` 完全一致。
//! - **前置条件 (What)**：单线程执行，`usage()` 在无并发时精确。

#![cfg(not(any(loom, spark_loom)))]

use std::{collections::HashMap, sync::Arc};

use chunk_pool::{BoundedPool, BufferPool, NoopObserver, RecyclingPool, SharedBuffer};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum RefOp {
    Acquire,
    Share(usize),
    Unref(usize),
}

fn ref_ops() -> impl Strategy<Value = Vec<RefOp>> {
    prop::collection::vec(
        prop_oneof![
            2 => Just(RefOp::Acquire),
            3 => any::<usize>().prop_map(RefOp::Share),
            4 => any::<usize>().prop_map(RefOp::Unref),
        ],
        0..64,
    )
}

#[derive(Clone, Debug)]
enum BoundedOp {
    Acquire,
    Release(usize),
}

fn bounded_ops() -> impl Strategy<Value = Vec<BoundedOp>> {
    prop::collection::vec(
        prop_oneof![
            Just(BoundedOp::Acquire),
            any::<usize>().prop_map(BoundedOp::Release),
        ],
        0..64,
    )
}

/// 以持有列表推导每块缓冲的期望引用计数，并与池的真实状态比对。
fn check_recycling_invariant(
    pool: &RecyclingPool,
    holders: &[SharedBuffer],
) -> Result<(), TestCaseError> {
    let mut expected: HashMap<u64, isize> = HashMap::new();
    for holder in holders {
        *expected.entry(holder.id()).or_default() += 1;
    }
    for holder in holders {
        prop_assert_eq!(holder.ref_count(), expected[&holder.id()]);
    }
    let usage = pool.usage();
    prop_assert_eq!(usage.in_use, expected.len());
    prop_assert_eq!(usage.idle, usage.allocated - expected.len());
    Ok(())
}

proptest! {
    #[test]
    fn prop_idle_iff_reference_count_is_zero(ops in ref_ops()) {
        let pool = RecyclingPool::with_observer(8, Arc::new(NoopObserver));
        let mut holders: Vec<SharedBuffer> = Vec::new();
        for op in ops {
            match op {
                RefOp::Acquire => holders.push(pool.acquire()),
                RefOp::Share(index) if !holders.is_empty() => {
                    let shared = holders[index % holders.len()].share();
                    holders.push(shared);
                }
                RefOp::Unref(index) if !holders.is_empty() => {
                    let holder = holders.swap_remove(index % holders.len());
                    pool.release(holder);
                }
                _ => {}
            }
            check_recycling_invariant(&pool, &holders)?;
        }
        for holder in holders.drain(..) {
            holder.unref();
        }
        let usage = pool.usage();
        prop_assert_eq!(usage.in_use, 0);
        prop_assert_eq!(usage.idle, usage.allocated);
    }

    #[test]
    fn prop_bounded_accounting_matches_model(capacity in 2usize..6, ops in bounded_ops()) {
        let pool = BoundedPool::with_observer(capacity, 32, Arc::new(NoopObserver));
        let mut held = Vec::new();
        let (mut idle, mut overflow, mut discarded) = (capacity, 0usize, 0usize);
        for op in ops {
            match op {
                BoundedOp::Acquire => {
                    let buffer = pool.acquire();
                    prop_assert_eq!(buffer.len(), 32);
                    if idle > 0 { idle -= 1 } else { overflow += 1 }
                    held.push(buffer);
                }
                BoundedOp::Release(index) if !held.is_empty() => {
                    let buffer = held.swap_remove(index % held.len());
                    pool.release(buffer);
                    if idle < capacity { idle += 1 } else { discarded += 1 }
                }
                BoundedOp::Release(_) => {}
            }
            let usage = pool.usage();
            prop_assert_eq!(usage.idle, idle);
            prop_assert_eq!(usage.overflow_allocations, overflow);
            prop_assert_eq!(usage.discarded, discarded);
            prop_assert_eq!(usage.in_use, held.len());
        }
    }
}
