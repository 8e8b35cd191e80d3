use std::any::type_name;
use std::fmt;

use crate::{
    DropPolicy, GlobalAllocator, Initializer, LifecyclePool, ObjectAllocator, Pool, Poolable,
    Result,
};

/// Builder for creating an instance of [`Pool`] or [`LifecyclePool`].
///
/// Start with [`Pool::builder()`] for default-initialized objects or
/// [`Pool::builder_with_prototype()`] for objects cloned from a prototype value.
///
/// All settings are optional. By default, the pool starts out empty, is not expandable, uses the
/// [global allocator][GlobalAllocator] and may be dropped while objects are checked out.
///
/// # Examples
///
/// ```
/// use reuse_pool::{DropPolicy, Pool};
///
/// let pool = Pool::builder_with_prototype([0_u8; 64])
///     .size(32)
///     .expandable(true)
///     .drop_policy(DropPolicy::MustNotDropCheckedOut)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.capacity(), 32);
/// assert_eq!(pool.max_capacity(), 32);
/// ```
#[must_use]
pub struct PoolBuilder<T, A = GlobalAllocator> {
    size: usize,
    expandable: bool,
    initializer: Initializer<T>,
    allocator: A,
    drop_policy: DropPolicy,
}

impl<T, A> fmt::Debug for PoolBuilder<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("allocator_type", &format_args!("{}", type_name::<A>()))
            .field("size", &self.size)
            .field("expandable", &self.expandable)
            .field("initializer", &self.initializer)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> PoolBuilder<T> {
    pub(crate) fn new(initializer: Initializer<T>) -> Self {
        Self {
            size: 0,
            expandable: false,
            initializer,
            allocator: GlobalAllocator,
            drop_policy: DropPolicy::default(),
        }
    }
}

impl<T, A> PoolBuilder<T, A> {
    /// Sets the number of objects allocated up front. This is also the initial ceiling on the
    /// number of objects the pool may hold.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets whether the pool may allocate additional objects, up to its ceiling, once the free
    /// objects run out.
    pub fn expandable(mut self, expandable: bool) -> Self {
        self.expandable = expandable;
        self
    }

    /// Sets the prototype that new objects are cloned from, replacing any previous prototype or
    /// default initialization.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let pool = Pool::<u32>::builder().size(1).prototype(5).build().unwrap();
    ///
    /// assert_eq!(pool.prototype(), Some(&5));
    /// ```
    pub fn prototype(mut self, prototype: T) -> Self
    where
        T: Clone,
    {
        self.initializer = Initializer::from_prototype(prototype);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat checked-out objects when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the strategy used to allocate and release the storage of pooled objects.
    ///
    /// The pool takes ownership of the allocator; it remains reachable through
    /// [`Pool::allocator()`].
    pub fn allocator<B>(self, allocator: B) -> PoolBuilder<T, B>
    where
        B: ObjectAllocator<T>,
    {
        PoolBuilder {
            size: self.size,
            expandable: self.expandable,
            initializer: self.initializer,
            allocator,
            drop_policy: self.drop_policy,
        }
    }
}

impl<T, A: ObjectAllocator<T>> PoolBuilder<T, A> {
    /// Builds the pool, allocating the initial batch of objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`][crate::Error::Allocation] if any object of the initial batch
    /// cannot be allocated. Objects allocated before the failure are released again.
    pub fn build(self) -> Result<Pool<T, A>> {
        Pool::new_inner(
            self.size,
            self.expandable,
            self.initializer,
            self.allocator,
            self.drop_policy,
        )
    }

    /// Builds a [`LifecyclePool`] that notifies its objects when they are checked out and
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`][crate::Error::Allocation] if any object of the initial batch
    /// cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{Pool, Poolable};
    ///
    /// #[derive(Default)]
    /// struct Job {
    ///     active: bool,
    /// }
    ///
    /// impl Poolable for Job {
    ///     fn is_active(&self) -> bool {
    ///         self.active
    ///     }
    ///
    ///     fn set_active(&mut self, active: bool) {
    ///         self.active = active;
    ///     }
    /// }
    ///
    /// let pool = Pool::<Job>::builder().size(4).build_lifecycle().unwrap();
    ///
    /// assert_eq!(pool.capacity(), 4);
    /// ```
    pub fn build_lifecycle(self) -> Result<LifecyclePool<T, A>>
    where
        T: Poolable,
    {
        self.build().map(LifecyclePool::from)
    }
}

#[cfg(test)]
mod tests {
    use std::ptr::NonNull;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::AllocError;

    assert_impl_all!(PoolBuilder<u32>: Send, Sync);

    #[test]
    fn defaults() {
        let pool = Pool::<u32>::builder().build().unwrap();

        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.max_capacity(), 0);
        assert!(!pool.is_expandable());
        assert!(!pool.has_prototype());
        assert_eq!(pool.drop_policy(), DropPolicy::MayDropCheckedOut);
    }

    #[test]
    fn settings_are_applied() {
        let pool = Pool::<u32>::builder()
            .size(5)
            .expandable(true)
            .prototype(9)
            .drop_policy(DropPolicy::MustNotDropCheckedOut)
            .build()
            .unwrap();

        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.available(), 5);
        assert_eq!(pool.max_capacity(), 5);
        assert!(pool.is_expandable());
        assert_eq!(pool.prototype(), Some(&9));
        assert_eq!(pool.drop_policy(), DropPolicy::MustNotDropCheckedOut);
    }

    #[test]
    fn allocator_is_carried_over() {
        #[derive(Debug)]
        struct Tagged(GlobalAllocator, &'static str);

        impl<T> ObjectAllocator<T> for Tagged {
            fn allocate(&mut self) -> std::result::Result<NonNull<T>, AllocError> {
                ObjectAllocator::<T>::allocate(&mut self.0)
            }

            unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
                // SAFETY: Forwarding the caller's guarantees.
                unsafe { self.0.deallocate(ptr) }
            }
        }

        let pool = Pool::<u32>::builder()
            .size(2)
            .allocator(Tagged(GlobalAllocator, "custom"))
            .build()
            .unwrap();

        assert_eq!(pool.allocator().1, "custom");
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn debug_output_names_types() {
        let builder = Pool::<u8>::builder().size(3);

        let output = format!("{builder:?}");

        assert!(output.contains("u8"));
        assert!(output.contains("GlobalAllocator"));
    }
}
