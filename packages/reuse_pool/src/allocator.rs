use std::alloc::{Layout, alloc, dealloc};
use std::ptr::{self, NonNull};

use crate::AllocError;

/// A pluggable strategy for obtaining and releasing the storage of pooled objects.
///
/// The pool calls the four steps in pairs: [`allocate()`][1] followed by [`construct()`][2] when
/// it creates an object, and [`destroy()`][3] followed by [`deallocate()`][4] when it gets rid of
/// one. The strategy is injected when the pool is built and is owned by the pool from then on.
///
/// Only [`allocate()`][1] and [`deallocate()`][4] are required; construction and destruction
/// default to moving the value into place and dropping it in place.
///
/// # Examples
///
/// ```
/// use std::ptr::NonNull;
///
/// use reuse_pool::{AllocError, GlobalAllocator, ObjectAllocator, Pool};
///
/// /// Counts how many objects were ever allocated.
/// #[derive(Debug, Default)]
/// struct Counting {
///     inner: GlobalAllocator,
///     allocated: usize,
/// }
///
/// impl<T> ObjectAllocator<T> for Counting {
///     fn allocate(&mut self) -> Result<NonNull<T>, AllocError> {
///         self.allocated += 1;
///         ObjectAllocator::<T>::allocate(&mut self.inner)
///     }
///
///     unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
///         // SAFETY: Forwarding the caller's guarantees.
///         unsafe { self.inner.deallocate(ptr) }
///     }
/// }
///
/// let pool = Pool::<u64>::builder()
///     .size(3)
///     .allocator(Counting::default())
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.allocator().allocated, 3);
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::construct
/// [3]: Self::destroy
/// [4]: Self::deallocate
pub trait ObjectAllocator<T> {
    /// Obtains uninitialized storage for one `T`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the storage cannot be provided. The pool propagates this to
    /// the caller of the operation that needed the object.
    fn allocate(&mut self) -> Result<NonNull<T>, AllocError>;

    /// Moves `value` into storage previously obtained from [`allocate()`][Self::allocate].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate()` on this allocator, must not have been
    /// deallocated and must not currently hold a constructed object.
    unsafe fn construct(&mut self, ptr: NonNull<T>, value: T) {
        // SAFETY: The caller guarantees the storage is valid for writes and uninitialized.
        unsafe {
            ptr.write(value);
        }
    }

    /// Runs the destructor of the object at `ptr`, leaving the storage uninitialized.
    ///
    /// # Safety
    ///
    /// `ptr` must point to an object constructed via [`construct()`][Self::construct] on this
    /// allocator that has not yet been destroyed.
    unsafe fn destroy(&mut self, ptr: NonNull<T>) {
        // SAFETY: The caller guarantees there is a live object here that nobody else will use.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
        }
    }

    /// Releases storage previously obtained from [`allocate()`][Self::allocate].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate()` on this allocator, must not have been
    /// deallocated already and must not hold a constructed object.
    unsafe fn deallocate(&mut self, ptr: NonNull<T>);
}

/// The default allocation strategy, backed by the global Rust allocator.
///
/// Allocation failure is reported as [`AllocError`] instead of aborting the process. Zero-sized
/// types never touch the global allocator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "stateless unit struct that callers construct by name, e.g. to delegate to it"
)]
pub struct GlobalAllocator;

impl<T> ObjectAllocator<T> for GlobalAllocator {
    fn allocate(&mut self) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::new::<T>();

        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }

        // SAFETY: The layout is valid for `T` and we checked above that it is not zero-sized.
        let ptr = unsafe { alloc(layout) };

        NonNull::new(ptr.cast::<T>()).ok_or_else(|| AllocError::new(layout))
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
        let layout = Layout::new::<T>();

        if layout.size() == 0 {
            return;
        }

        // SAFETY: The caller guarantees `ptr` came from `allocate()` above, which used the
        // same layout.
        unsafe {
            dealloc(ptr.as_ptr().cast(), layout);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn full_cycle_with_global_allocator() {
        let mut allocator = GlobalAllocator;

        let ptr: NonNull<String> = allocator.allocate().unwrap();

        unsafe {
            allocator.construct(ptr, "hello".to_string());
            assert_eq!(ptr.as_ref(), "hello");
            allocator.destroy(ptr);
            allocator.deallocate(ptr);
        }
    }

    #[test]
    fn destroy_runs_destructor() {
        let drops = Rc::new(Cell::new(0));
        let mut allocator = GlobalAllocator;

        let ptr: NonNull<DropCounter> = allocator.allocate().unwrap();

        unsafe {
            allocator.construct(ptr, DropCounter(Rc::clone(&drops)));
            assert_eq!(drops.get(), 0);

            allocator.destroy(ptr);
            assert_eq!(drops.get(), 1);

            allocator.deallocate(ptr);
        }

        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn zero_sized_types_are_supported() {
        let mut allocator = GlobalAllocator;

        let ptr: NonNull<()> = allocator.allocate().unwrap();

        unsafe {
            allocator.construct(ptr, ());
            allocator.destroy(ptr);
            allocator.deallocate(ptr);
        }
    }
}
