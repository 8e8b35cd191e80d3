//! Compares checking objects out of a `Pool` and returning them against allocating them with
//! `Box::new()` and dropping them, for element types of different construction cost.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::time::Instant;

use criterion::measurement::WallTime;
use criterion::{BenchmarkGroup, Criterion, criterion_group, criterion_main};
use reuse_pool::{Pool, Poolable};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const POOL_SIZE: usize = 25;

#[allow(dead_code, reason = "fields are only there to make construction realistically costly")]
#[derive(Clone, Debug, Default)]
struct Person {
    name: String,
    age: u32,
    year: u32,
    month: u32,
    day: u32,
    mothers_name: String,
    city: String,
    street: String,
    house_number: u32,
    friends: Vec<String>,
}

/// Does a bit of busywork when constructed, so that skipping construction is worth something.
#[allow(dead_code, reason = "the value is only computed, never read")]
#[derive(Clone, Debug)]
struct Counter {
    value: u32,
}

impl Default for Counter {
    fn default() -> Self {
        let mut value: u32 = 0;

        for _ in 0..1000 {
            value = black_box(value.wrapping_add(1));
        }

        Self { value }
    }
}

#[derive(Clone, Debug, Default)]
struct Session {
    active: bool,
    buffer: Vec<u8>,
}

impl Poolable for Session {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn on_return(&mut self) {
        self.buffer.clear();
    }
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("reuse_basic");

    compare::<u32>(&mut group, "u32");
    compare::<String>(&mut group, "string");
    compare::<Person>(&mut group, "person");
    compare::<Counter>(&mut group, "counter");

    group.bench_function("lifecycle_checkout_release", |b| {
        b.iter_custom(|iters| {
            let mut pool = Pool::<Session>::builder()
                .size(POOL_SIZE)
                .build_lifecycle()
                .unwrap();

            let start = Instant::now();

            for _ in 0..iters {
                let handle = pool.checkout().unwrap().unwrap();
                black_box(pool.get_mut(handle));
                _ = black_box(pool.release(handle).unwrap());
            }

            start.elapsed()
        });
    });

    group.bench_function("expand_to_ceiling", |b| {
        b.iter_custom(|iters| {
            let mut pools = (0..iters)
                .map(|_| {
                    let mut pool = Pool::<Person>::new(0, true).unwrap();
                    pool.set_max_capacity(POOL_SIZE);
                    pool
                })
                .collect::<Vec<_>>();

            let start = Instant::now();

            for pool in &mut pools {
                while let Some(handle) = pool.checkout().unwrap() {
                    _ = black_box(handle);
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

fn compare<T: Default>(group: &mut BenchmarkGroup<'_, WallTime>, name: &str) {
    group.bench_function(format!("{name}_box_new_drop"), |b| {
        b.iter(|| {
            drop(black_box(Box::new(T::default())));
        });
    });

    group.bench_function(format!("{name}_pool_checkout_release"), |b| {
        b.iter_custom(|iters| {
            let mut pool = Pool::<T>::new(POOL_SIZE, false).unwrap();

            let start = Instant::now();

            for _ in 0..iters {
                let handle = pool.checkout().unwrap().unwrap();
                black_box(pool.get_mut(handle));
                pool.release(handle).unwrap();
            }

            start.elapsed()
        });
    });
}
