//! Integration tests for the `reuse_pool` package.
//!
//! These tests drive `Pool` and `LifecyclePool` through longer checkout/return sequences and
//! verify the capacity bookkeeping, the ceiling and the lifecycle contract from the outside.

use std::collections::HashSet;

use reuse_pool::{Error, Handle, Pool, Poolable};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Person {
    name: String,
    age: u32,
    friends: Vec<String>,
}

#[derive(Clone, Debug, Default)]
struct Session {
    active: bool,
    checkouts: u32,
    returns: u32,
}

impl Poolable for Session {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn on_checkout(&mut self) {
        self.checkouts = self.checkouts.checked_add(1).unwrap();
    }

    fn on_return(&mut self) {
        self.returns = self.returns.checked_add(1).unwrap();
    }
}

fn assert_consistent<T>(pool: &Pool<T>) {
    assert_eq!(pool.capacity(), pool.available() + pool.checked_out());
}

#[test]
fn prototype_scenario() {
    let prototype = Person {
        name: "X".to_string(),
        age: 30,
        friends: vec!["Y".to_string()],
    };

    let mut pool = Pool::builder_with_prototype(prototype.clone())
        .size(2)
        .expandable(false)
        .build()
        .unwrap();

    let first = pool.checkout().unwrap().unwrap();
    let second = pool.checkout().unwrap().unwrap();

    assert_ne!(first, second);
    assert_eq!(pool.get(first), &prototype);
    assert_eq!(pool.get(second), &prototype);

    assert_eq!(pool.checkout().unwrap(), None);

    pool.release(second).unwrap();

    let recycled = pool.checkout().unwrap().unwrap();
    assert_eq!(recycled, second);
    assert_eq!(pool.get(recycled), &prototype);
}

#[test]
fn capacity_invariant_holds_across_mixed_operations() {
    let mut pool = Pool::<Person>::new(4, true).unwrap();
    pool.set_max_capacity(8);

    let mut held: Vec<Handle> = Vec::new();

    // A deterministic mix of checkouts and returns that stays within the ceiling.
    for step in 0_usize..200 {
        if step % 3 == 2 && !held.is_empty() {
            let handle = held.remove(step % held.len());
            pool.release(handle).unwrap();
        } else if let Some(handle) = pool.checkout().unwrap() {
            held.push(handle);
        }

        assert_consistent(&pool);
        assert!(pool.capacity() <= pool.max_capacity());
        assert_eq!(pool.checked_out(), held.len());
    }

    for handle in held {
        pool.release(handle).unwrap();
    }

    pool.deletion_check().unwrap();
}

#[test]
fn live_handles_are_unique() {
    let mut pool = Pool::<u64>::new(16, true).unwrap();
    pool.set_max_capacity(32);

    let mut live = HashSet::new();

    for round in 0..4 {
        while let Some(handle) = pool.checkout().unwrap() {
            assert!(live.insert(handle), "handle issued twice in round {round}");
        }

        // Give back every other handle.
        let returned = live.iter().copied().step_by(2).collect::<Vec<_>>();
        for handle in returned {
            pool.release(handle).unwrap();
            live.remove(&handle);
        }
    }
}

#[test]
fn non_expandable_pool_yields_exactly_size_objects() {
    let mut pool = Pool::<Person>::new(5, false).unwrap();

    for _ in 0..5 {
        assert!(pool.checkout().unwrap().is_some());
    }

    assert!(pool.checkout().unwrap().is_none());
    assert!(pool.checkout().unwrap().is_none());
}

#[test]
fn expandable_ceiling_is_respected_in_steady_state() {
    let mut pool = Pool::<u32>::new(2, true).unwrap();
    pool.set_max_capacity(6);

    // Churn first, so the pool has a history of returns and re-checkouts.
    for _ in 0..10 {
        let handles = (0..4)
            .map(|_| pool.checkout().unwrap().unwrap())
            .collect::<Vec<_>>();

        for handle in handles {
            pool.release(handle).unwrap();
        }
    }

    let mut obtained = Vec::new();
    while let Some(handle) = pool.checkout().unwrap() {
        obtained.push(handle);
    }

    assert_eq!(obtained.len(), 6);
    assert_eq!(pool.capacity(), 6);
}

#[test]
fn lowered_ceiling_destroys_on_the_next_returns_only() {
    let size = 6;
    let new_max = 2;

    let mut pool = Pool::<Person>::new(size, false).unwrap();

    let handles = (0..size)
        .map(|_| pool.checkout().unwrap().unwrap())
        .collect::<Vec<_>>();

    pool.set_max_capacity(new_max);
    assert_eq!(pool.capacity(), size);

    for (returned, handle) in handles.into_iter().enumerate() {
        pool.release(handle).unwrap();

        if returned < size - new_max {
            // Destroyed instead of recycled.
            assert_eq!(pool.capacity(), size - returned - 1);
            assert_eq!(pool.available(), 0);
        } else {
            assert_eq!(pool.capacity(), new_max);
        }

        assert_consistent(&pool);
    }

    assert_eq!(pool.available(), new_max);
}

#[test]
fn deletion_check_reports_outstanding_objects() {
    let mut pool = Pool::<u8>::new(3, false).unwrap();

    pool.deletion_check().unwrap();

    let handle = pool.checkout().unwrap().unwrap();
    assert!(matches!(
        pool.deletion_check(),
        Err(Error::ObjectInUse { count: 1 })
    ));

    pool.release(handle).unwrap();
    pool.deletion_check().unwrap();
}

#[test]
fn lifecycle_pool_contract() {
    let mut pool = Pool::<Session>::builder()
        .size(2)
        .build_lifecycle()
        .unwrap();

    let handle = pool.checkout().unwrap().unwrap();
    assert_eq!(pool.get(handle).checkouts, 1);

    pool.get_mut(handle).set_active(true);

    assert!(!pool.release(handle).unwrap());
    assert!(pool.is_checked_out(handle));
    assert_eq!(pool.get(handle).returns, 0);

    pool.get_mut(handle).set_active(false);

    assert!(pool.release(handle).unwrap());
    assert!(!pool.is_checked_out(handle));

    // The same instance comes back first and shows exactly one return.
    let again = pool.checkout().unwrap().unwrap();
    assert_eq!(again, handle);
    assert_eq!(pool.get(again).returns, 1);
    assert_eq!(pool.get(again).checkouts, 2);
}

#[test]
fn pool_can_move_to_another_thread() {
    let mut pool = Pool::<String>::new(2, false).unwrap();
    let handle = pool.checkout().unwrap().unwrap();
    pool.get_mut(handle).push_str("moved");

    let pool = std::thread::spawn(move || {
        assert_eq!(pool.get(handle), "moved");
        pool
    })
    .join()
    .unwrap();

    assert_eq!(pool.checked_out(), 1);
}
