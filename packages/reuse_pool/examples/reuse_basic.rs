//! Basic usage of the `reuse_pool` crate:
//!
//! * Creating a pool whose objects are cloned from a prototype.
//! * Checking objects out and returning them.
//! * Lifecycle hooks that refuse the return of an active object.
//! * Checking that nothing is outstanding before dropping the pool.

use reuse_pool::{Pool, Poolable};

#[derive(Clone, Debug, Default)]
struct Widget {
    value: u32,
    active: bool,
}

impl Poolable for Widget {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn on_checkout(&mut self) {
        println!("Widget with value {} checked out", self.value);
    }

    fn on_return(&mut self) {
        println!("Widget with value {} returned", self.value);
    }
}

fn main() {
    let prototype = Widget {
        value: 8,
        active: false,
    };

    // A single pre-allocated object, cloned from the prototype, with no room to grow.
    let mut pool = Pool::builder_with_prototype(prototype)
        .size(1)
        .expandable(false)
        .build_lifecycle()
        .unwrap();

    println!(
        "Pool holds {} object(s), {} available, ceiling {}",
        pool.capacity(),
        pool.available(),
        pool.max_capacity()
    );

    let handle = pool.checkout().unwrap().expect("the pool starts with one free object");
    println!("Checked out value: {}", pool.get(handle).value);

    // The only object is out, so the pool has nothing more to give.
    assert!(pool.checkout().unwrap().is_none());
    println!("Second checkout came back empty");

    pool.get_mut(handle).value = 42;
    pool.get_mut(handle).set_active(true);

    // Active objects stay with the caller.
    let accepted = pool.release(handle).unwrap();
    println!("Return of active object accepted: {accepted}");

    pool.get_mut(handle).set_active(false);
    let accepted = pool.release(handle).unwrap();
    println!("Return of inactive object accepted: {accepted}");

    // The same instance is recycled; it keeps the state it was returned with.
    let handle = pool.checkout().unwrap().expect("the object was returned");
    println!("Recycled value: {}", pool.get(handle).value);
    _ = pool.release(handle).unwrap();

    pool.deletion_check().unwrap();
    println!("Nothing is checked out, the pool can be dropped");
}
