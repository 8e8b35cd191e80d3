//! A bounded object pool that pre-allocates objects and recycles them instead of allocating
//! and deallocating them over and over.
//!
//! This crate provides [`Pool`], which creates a batch of same-typed objects up front and hands
//! them out on demand, and [`LifecyclePool`], which additionally tells its objects when they are
//! checked out and returned.
//!
//! # Key Features
//!
//! - **Up-front allocation**: The initial batch is allocated when the pool is built
//! - **Bounded growth**: An expandable pool allocates more objects on demand, up to a ceiling
//! - **Prototype initialization**: New objects are cloned from a prototype or default-constructed
//! - **LIFO reuse**: The most recently returned object is the next one handed out
//! - **Lazy eviction**: Lowering the ceiling destroys surplus objects as they are returned
//! - **Validated handles**: Returning an object twice or to the wrong pool is reported as an error
//! - **Lifecycle hooks**: [`Poolable`] objects are notified on checkout and return and can veto
//!   their return while active
//! - **Pluggable allocation**: Storage comes from an [`ObjectAllocator`] injected at build time
//! - **Explicit teardown**: A [`DropPolicy`] decides whether the pool may be dropped while objects
//!   are checked out
//!
//! # Handles
//!
//! [`checkout()`](Pool::checkout) returns a [`Handle`] rather than a reference. The pool keeps
//! ownership of every object; the handle is used to access the object through
//! [`get()`](Pool::get) and [`get_mut()`](Pool::get_mut) and to give it back through
//! [`release()`](Pool::release).
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust
//! use reuse_pool::Pool;
//!
//! // Two pre-allocated buffers, no growth beyond that.
//! let mut pool = Pool::<Vec<u8>>::new(2, false).unwrap();
//!
//! let handle = pool.checkout().unwrap().expect("a free buffer is available");
//! pool.get_mut(handle).extend_from_slice(b"payload");
//! assert_eq!(pool.get(handle).len(), 7);
//!
//! pool.release(handle).unwrap();
//!
//! // Nothing is checked out, so the pool can be safely dropped.
//! pool.deletion_check().unwrap();
//! ```
//!
//! ## Prototypes and Expansion
//!
//! ```rust
//! use reuse_pool::Pool;
//!
//! let mut pool = Pool::builder_with_prototype(String::from("blank"))
//!     .size(1)
//!     .expandable(true)
//!     .build()
//!     .unwrap();
//!
//! // The ceiling starts out equal to the initial size; raise it to allow growth.
//! pool.set_max_capacity(2);
//!
//! let a = pool.checkout().unwrap().unwrap();
//! let b = pool.checkout().unwrap().unwrap();
//! assert_eq!(pool.get(b), "blank");
//!
//! // At the ceiling now.
//! assert!(pool.checkout().unwrap().is_none());
//! # pool.release(a).unwrap();
//! # pool.release(b).unwrap();
//! ```
//!
//! ## Lifecycle Hooks
//!
//! ```rust
//! use reuse_pool::{Pool, Poolable};
//!
//! #[derive(Default)]
//! struct Request {
//!     active: bool,
//!     body: String,
//! }
//!
//! impl Poolable for Request {
//!     fn is_active(&self) -> bool {
//!         self.active
//!     }
//!
//!     fn set_active(&mut self, active: bool) {
//!         self.active = active;
//!     }
//!
//!     fn on_return(&mut self) {
//!         self.body.clear();
//!     }
//! }
//!
//! let mut pool = Pool::<Request>::builder().size(4).build_lifecycle().unwrap();
//!
//! let handle = pool.checkout().unwrap().unwrap();
//! let request = pool.get_mut(handle);
//! request.set_active(true);
//! request.body.push_str("GET /");
//!
//! // Active objects cannot be returned.
//! assert!(!pool.release(handle).unwrap());
//!
//! pool.get_mut(handle).set_active(false);
//! assert!(pool.release(handle).unwrap());
//! ```

mod allocator;
mod builder;
mod drop_policy;
mod error;
mod initializer;
mod lifecycle_pool;
mod pool;
mod poolable;
mod slot_arena;

pub use allocator::*;
pub use builder::*;
pub use drop_policy::*;
pub use error::{AllocError, Error};
pub(crate) use error::Result;
pub(crate) use initializer::*;
pub use lifecycle_pool::*;
pub use pool::{Handle, Pool};
pub use poolable::*;
pub(crate) use slot_arena::*;
