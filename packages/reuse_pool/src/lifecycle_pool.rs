use std::any::type_name;
use std::fmt;
use std::ops::Deref;

use tracing::debug;

use crate::{GlobalAllocator, Handle, ObjectAllocator, Pool, Poolable, Result};

/// A [`Pool`] whose objects are told when they are checked out and returned.
///
/// Every checkout calls [`Poolable::on_checkout()`] on the object before its handle is returned,
/// and every accepted return calls [`Poolable::on_return()`] exactly once, whether the object is
/// then recycled or destroyed.
///
/// An object that reports itself as [active][Poolable::is_active] cannot be returned: the
/// attempt is refused and the object stays checked out until its owner deactivates it.
///
/// All read-only operations of the underlying [`Pool`] are available through [`Deref`]. Anything
/// that changes which objects are checked out goes through this type, so the lifecycle calls
/// cannot be bypassed.
///
/// # Examples
///
/// ```
/// use reuse_pool::{Pool, Poolable};
///
/// #[derive(Clone, Default)]
/// struct Particle {
///     active: bool,
///     position: (f32, f32),
/// }
///
/// impl Poolable for Particle {
///     fn is_active(&self) -> bool {
///         self.active
///     }
///
///     fn set_active(&mut self, active: bool) {
///         self.active = active;
///     }
///
///     fn on_checkout(&mut self) {
///         self.active = true;
///     }
///
///     fn on_return(&mut self) {
///         self.position = (0.0, 0.0);
///     }
/// }
///
/// let mut pool = Pool::<Particle>::builder()
///     .size(16)
///     .build_lifecycle()
///     .unwrap();
///
/// let handle = pool.checkout().unwrap().unwrap();
/// pool.get_mut(handle).position = (1.0, 2.0);
///
/// // Still active, so the pool refuses to take it back.
/// assert!(!pool.release(handle).unwrap());
///
/// pool.get_mut(handle).set_active(false);
/// assert!(pool.release(handle).unwrap());
/// ```
pub struct LifecyclePool<T: Poolable, A: ObjectAllocator<T> = GlobalAllocator> {
    inner: Pool<T, A>,
}

impl<T: Poolable, A: ObjectAllocator<T>> LifecyclePool<T, A> {
    /// Checks out an object and calls [`Poolable::on_checkout()`] on it.
    ///
    /// Free objects and expansion are handled exactly as by [`Pool::checkout()`]. Returns
    /// `Ok(None)` if no object is available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`][crate::Error::Allocation] if the pool tried to expand and
    /// the allocator failed.
    pub fn checkout(&mut self) -> Result<Option<Handle>> {
        let Some(handle) = self.inner.checkout()? else {
            return Ok(None);
        };

        self.inner.get_mut(handle).on_checkout();

        Ok(Some(handle))
    }

    /// Returns a checked-out object to the pool, unless it is still active.
    ///
    /// Returns `Ok(false)` without doing anything if the object is [active][Poolable::is_active].
    /// Otherwise calls [`Poolable::on_return()`] on the object, then recycles or destroys it
    /// exactly as [`Pool::release()`] would, and returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownHandle`][crate::Error::UnknownHandle] if the handle was not issued by
    ///   this pool or its object has been destroyed.
    /// * [`Error::NotCheckedOut`][crate::Error::NotCheckedOut] if the object has already been
    ///   returned.
    pub fn release(&mut self, handle: Handle) -> Result<bool> {
        let index = self.inner.checked_out_index(handle)?;

        let object = self.inner.get_mut(handle);

        if object.is_active() {
            debug!(
                item_type = type_name::<T>(),
                ?handle,
                "refused to take back an active object"
            );
            return Ok(false);
        }

        object.on_return();

        self.inner.release_index(index);

        Ok(true)
    }

    /// Gets an exclusive reference to a checked-out object.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an object checked out of this pool.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.inner.get_mut(handle)
    }

    /// Changes the ceiling on the number of objects. See [`Pool::set_max_capacity()`].
    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.inner.set_max_capacity(max_capacity);
    }

    /// Sets whether the pool may allocate new objects. See [`Pool::set_expandable()`].
    pub fn set_expandable(&mut self, expandable: bool) {
        self.inner.set_expandable(expandable);
    }

    /// Destroys surplus free objects. See [`Pool::shrink_to_fit()`].
    ///
    /// Free objects have already seen [`Poolable::on_return()`], so no lifecycle call is made.
    pub fn shrink_to_fit(&mut self) {
        self.inner.shrink_to_fit();
    }

    /// Unwraps the underlying pool, giving up the lifecycle calls.
    #[must_use]
    pub fn into_inner(self) -> Pool<T, A> {
        self.inner
    }
}

impl<T: Poolable, A: ObjectAllocator<T>> From<Pool<T, A>> for LifecyclePool<T, A> {
    /// Wraps an existing pool.
    ///
    /// Objects already checked out of `pool` did not see [`Poolable::on_checkout()`] but will
    /// see [`Poolable::on_return()`] when returned through the wrapper.
    fn from(pool: Pool<T, A>) -> Self {
        Self { inner: pool }
    }
}

impl<T: Poolable, A: ObjectAllocator<T>> fmt::Debug for LifecyclePool<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecyclePool")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: Poolable, A: ObjectAllocator<T>> Deref for LifecyclePool<T, A> {
    type Target = Pool<T, A>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{DropPolicy, Error};

    assert_impl_all!(LifecyclePool<Counted>: Send);
    assert_not_impl_any!(LifecyclePool<Counted>: Sync);

    #[derive(Clone, Debug, Default)]
    struct Counted {
        active: bool,
        checkouts: usize,
        returns: usize,
        payload: u32,
    }

    impl Poolable for Counted {
        fn is_active(&self) -> bool {
            self.active
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn on_checkout(&mut self) {
            self.checkouts += 1;
        }

        fn on_return(&mut self) {
            self.returns += 1;
            self.payload = 0;
        }
    }

    /// Relies entirely on the default hooks.
    #[derive(Default)]
    struct Plain {
        active: bool,
    }

    impl Poolable for Plain {
        fn is_active(&self) -> bool {
            self.active
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }
    }

    #[test]
    fn checkout_fires_hook_once() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();

        assert_eq!(pool.get(handle).checkouts, 1);
        assert_eq!(pool.get(handle).returns, 0);
    }

    #[test]
    fn active_object_is_refused() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.get_mut(handle).set_active(true);

        assert!(!pool.release(handle).unwrap());
        assert!(pool.is_checked_out(handle));
        assert_eq!(pool.checked_out(), 1);
        assert_eq!(pool.get(handle).returns, 0);

        pool.get_mut(handle).set_active(false);

        assert!(pool.release(handle).unwrap());
        assert!(!pool.is_checked_out(handle));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn return_hook_fires_once_per_return() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        for round in 1..=3 {
            let handle = pool.checkout().unwrap().unwrap();
            pool.get_mut(handle).payload = 99;

            assert!(pool.release(handle).unwrap());

            let handle = pool.checkout().unwrap().unwrap();
            let object = pool.get(handle);
            assert_eq!(object.payload, 0);
            assert_eq!(object.returns, round * 2 - 1);
            assert_eq!(object.checkouts, round * 2);

            assert!(pool.release(handle).unwrap());
        }
    }

    /// Records, on destruction, how many times the return hook ran on this instance.
    #[derive(Clone, Debug, Default)]
    struct Evictable {
        active: bool,
        returns: usize,
        returns_at_drop: Rc<RefCell<Vec<usize>>>,
    }

    impl Poolable for Evictable {
        fn is_active(&self) -> bool {
            self.active
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn on_return(&mut self) {
            self.returns += 1;
        }
    }

    impl Drop for Evictable {
        fn drop(&mut self) {
            self.returns_at_drop.borrow_mut().push(self.returns);
        }
    }

    #[test]
    fn return_hook_fires_before_eviction() {
        let prototype = Evictable::default();
        let returns_at_drop = Rc::clone(&prototype.returns_at_drop);

        let mut pool = Pool::builder_with_prototype(prototype)
            .size(2)
            .build_lifecycle()
            .unwrap();

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();
        pool.set_max_capacity(1);

        assert!(pool.release(a).unwrap());
        assert_eq!(pool.capacity(), 1);

        // The evicted object saw exactly one return before it was destroyed.
        assert_eq!(*returns_at_drop.borrow(), [1]);

        assert!(pool.release(b).unwrap());
        assert_eq!(pool.capacity(), 1);
        assert_eq!(*returns_at_drop.borrow(), [1]);

        let c = pool.checkout().unwrap().unwrap();
        assert_eq!(c, b);
        assert_eq!(pool.get(c).returns, 1);
        assert!(pool.release(c).unwrap());

        drop(pool);

        // The surviving object, then the prototype, which was never checked out.
        assert_eq!(*returns_at_drop.borrow(), [1, 2, 0]);
    }

    #[test]
    fn exhausted_pool_fires_no_hook() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();

        assert_eq!(pool.checkout().unwrap(), None);
        assert_eq!(pool.get(handle).checkouts, 1);
    }

    #[test]
    fn expansion_fires_checkout_hook() {
        let mut pool = Pool::<Counted>::builder()
            .size(0)
            .expandable(true)
            .build_lifecycle()
            .unwrap();
        pool.set_max_capacity(1);

        let handle = pool.checkout().unwrap().unwrap();

        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.get(handle).checkouts, 1);
    }

    #[test]
    fn invalid_handles_are_errors() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        assert!(pool.release(handle).unwrap());

        assert!(matches!(
            pool.release(handle),
            Err(Error::NotCheckedOut { .. })
        ));

        let mut other = Pool::<Counted>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();
        let foreign = other.checkout().unwrap().unwrap();

        assert!(matches!(
            pool.release(foreign),
            Err(Error::UnknownHandle { .. })
        ));
        assert!(other.release(foreign).unwrap());
    }

    #[test]
    fn default_hooks_are_no_ops() {
        let mut pool = Pool::<Plain>::builder()
            .size(1)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        assert!(!pool.get(handle).is_active());

        assert!(pool.release(handle).unwrap());
        assert_eq!(pool.checkout().unwrap(), Some(handle));
    }

    #[test]
    fn deletion_check_and_drop_policy_pass_through() {
        let mut pool = Pool::<Counted>::builder()
            .size(1)
            .drop_policy(DropPolicy::MustNotDropCheckedOut)
            .build_lifecycle()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        assert!(matches!(
            pool.deletion_check(),
            Err(Error::ObjectInUse { count: 1 })
        ));

        assert!(pool.release(handle).unwrap());
        pool.deletion_check().unwrap();
    }

    #[test]
    fn shrink_and_unwrap() {
        let mut pool = Pool::<Counted>::builder()
            .size(3)
            .build_lifecycle()
            .unwrap();

        pool.set_max_capacity(1);
        pool.shrink_to_fit();
        assert_eq!(pool.capacity(), 1);

        pool.set_expandable(true);
        let mut inner = pool.into_inner();
        assert!(inner.is_expandable());

        // The plain pool no longer calls hooks.
        let handle = inner.checkout().unwrap().unwrap();
        assert_eq!(inner.get(handle).checkouts, 0);
    }
}
