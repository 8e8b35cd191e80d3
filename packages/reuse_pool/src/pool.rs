use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::debug;

use crate::{
    DropPolicy, Error, GlobalAllocator, Initializer, ObjectAllocator, PoolBuilder, Result,
    SlotArena, SlotState,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// An object pool that pre-allocates a batch of objects and recycles them.
///
/// The pool is created with `size` objects, each a clone of a prototype value or
/// `T::default()`. Objects are lent out through [`checkout()`][1], which returns a [`Handle`],
/// and taken back through [`release()`][2]. While an object is checked out, the caller accesses
/// it via [`get()`][3] and [`get_mut()`][4].
///
/// # Capacity
///
/// The pool tracks two numbers:
///
/// * [`capacity()`][5] - how many objects currently exist, whether free or checked out.
/// * [`max_capacity()`][6] - the ceiling. It starts out equal to `size`.
///
/// When no free object is left, an [expandable][7] pool allocates a new one as long as the
/// capacity is below the ceiling. Otherwise, checkout reports that no object is available.
///
/// Lowering the ceiling with [`set_max_capacity()`][8] does not destroy anything immediately.
/// Instead, each subsequent return destroys the returned object while the capacity exceeds the
/// ceiling. Use [`shrink_to_fit()`][9] to get rid of surplus free objects right away.
///
/// # Reuse order
///
/// The most recently returned object is the next one to be checked out.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if both the objects and the allocator are, but it is
/// not thread-safe ([`Sync`]). All operations are synchronous and must be serialized by the
/// owner.
///
/// # Examples
///
/// ```
/// use reuse_pool::Pool;
///
/// let mut pool = Pool::<Vec<u8>>::new(2, false).unwrap();
///
/// let a = pool.checkout().unwrap().expect("pool has two free objects");
/// let b = pool.checkout().unwrap().expect("pool has one free object");
///
/// pool.get_mut(a).extend_from_slice(b"hello");
///
/// // Both objects are out and the pool is not expandable.
/// assert!(pool.checkout().unwrap().is_none());
///
/// pool.release(b).unwrap();
///
/// // The returned object is handed out again.
/// assert_eq!(pool.checkout().unwrap(), Some(b));
/// # pool.release(a).unwrap();
/// # pool.release(b).unwrap();
/// ```
///
/// [1]: Self::checkout
/// [2]: Self::release
/// [3]: Self::get
/// [4]: Self::get_mut
/// [5]: Self::capacity
/// [6]: Self::max_capacity
/// [7]: Self::set_expandable
/// [8]: Self::set_max_capacity
/// [9]: Self::shrink_to_fit
pub struct Pool<T, A: ObjectAllocator<T> = GlobalAllocator> {
    /// Used to reject handles that were issued by a different pool.
    pool_id: u64,

    arena: SlotArena<T>,

    max_capacity: usize,
    expandable: bool,

    initializer: Initializer<T>,
    allocator: A,

    drop_policy: DropPolicy,
}

/// Identifies an object checked out of a [`Pool`] or [`LifecyclePool`][crate::LifecyclePool].
///
/// Handles are small and can be copied freely. They do not borrow the pool; instead, the pool
/// validates them whenever they are used.
///
/// # Handle reuse
///
/// Once the object is returned, the pool may hand out the same handle again when the object is
/// recycled. A copy kept from an earlier checkout will then refer to the new checkout.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    pool_id: u64,
    index: usize,
}

impl<T: Default> Pool<T> {
    /// Creates a pool of `size` default-initialized objects with the default configuration.
    ///
    /// `size` is also the initial ceiling. Use [`builder()`][Self::builder] for more options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the initial batch cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let pool = Pool::<String>::new(8, true).unwrap();
    ///
    /// assert_eq!(pool.capacity(), 8);
    /// assert_eq!(pool.max_capacity(), 8);
    /// assert!(pool.is_expandable());
    /// ```
    pub fn new(size: usize, expandable: bool) -> Result<Self> {
        Self::builder().size(size).expandable(expandable).build()
    }

    /// Starts building a pool whose objects are created with `T::default()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{DropPolicy, Pool};
    ///
    /// let pool = Pool::<u32>::builder()
    ///     .size(16)
    ///     .drop_policy(DropPolicy::MustNotDropCheckedOut)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(!pool.has_prototype());
    /// ```
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new(Initializer::from_default())
    }
}

impl<T: Clone> Pool<T> {
    /// Starts building a pool whose objects are created by cloning `prototype`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let mut pool = Pool::builder_with_prototype("template".to_string())
    ///     .size(2)
    ///     .build()
    ///     .unwrap();
    ///
    /// let handle = pool.checkout().unwrap().unwrap();
    /// assert_eq!(pool.get(handle), "template");
    /// # pool.release(handle).unwrap();
    /// ```
    pub fn builder_with_prototype(prototype: T) -> PoolBuilder<T> {
        PoolBuilder::new(Initializer::from_prototype(prototype))
    }
}

impl<T, A: ObjectAllocator<T>> Pool<T, A> {
    pub(crate) fn new_inner(
        size: usize,
        expandable: bool,
        initializer: Initializer<T>,
        allocator: A,
        drop_policy: DropPolicy,
    ) -> Result<Self> {
        let mut pool = Self {
            pool_id: generate_pool_id(),
            arena: SlotArena::with_capacity(size),
            max_capacity: size,
            expandable,
            initializer,
            allocator,
            drop_policy,
        };

        // If allocation fails midway, dropping `pool` releases whatever was already allocated.
        for _ in 0..size {
            let object = pool.allocate_object()?;
            pool.arena.insert_free(object);
        }

        debug!(
            item_type = type_name::<T>(),
            size,
            expandable,
            has_prototype = pool.has_prototype(),
            "created object pool"
        );

        Ok(pool)
    }

    /// Checks out an object, returning its handle.
    ///
    /// A free object is used if there is one, the most recently returned first. Otherwise, an
    /// expandable pool below its ceiling allocates a new object.
    ///
    /// Returns `Ok(None)` if no object is available. This is not an error: the pool is simply
    /// exhausted until something is returned or the ceiling is raised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the pool tried to expand and the allocator failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let mut pool = Pool::<u64>::new(1, true).unwrap();
    ///
    /// let first = pool.checkout().unwrap();
    /// assert!(first.is_some());
    ///
    /// // The ceiling is 1, so even an expandable pool cannot grow.
    /// assert!(pool.checkout().unwrap().is_none());
    ///
    /// pool.set_max_capacity(2);
    /// assert!(pool.checkout().unwrap().is_some());
    /// # pool.release(first.unwrap()).unwrap();
    /// ```
    pub fn checkout(&mut self) -> Result<Option<Handle>> {
        if let Some(index) = self.arena.check_out_top() {
            return Ok(Some(self.handle(index)));
        }

        if !self.can_expand() {
            return Ok(None);
        }

        let object = self.allocate_object()?;
        let index = self.arena.insert_checked_out(object);

        debug!(
            item_type = type_name::<T>(),
            capacity = self.capacity(),
            max_capacity = self.max_capacity,
            "expanded object pool"
        );

        Ok(Some(self.handle(index)))
    }

    /// Returns a checked-out object to the pool.
    ///
    /// If the pool holds more objects than its ceiling allows, the object is destroyed.
    /// Otherwise it is placed back among the free objects, to be the next one checked out.
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownHandle`] if the handle was not issued by this pool or its object has
    ///   been destroyed.
    /// * [`Error::NotCheckedOut`] if the object has already been returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{Error, Pool};
    ///
    /// let mut pool = Pool::<u64>::new(1, false).unwrap();
    ///
    /// let handle = pool.checkout().unwrap().unwrap();
    /// pool.release(handle).unwrap();
    ///
    /// // Returning the same object twice is detected.
    /// assert!(matches!(
    ///     pool.release(handle),
    ///     Err(Error::NotCheckedOut { .. })
    /// ));
    /// ```
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        let index = self.checked_out_index(handle)?;
        self.release_index(index);
        Ok(())
    }

    /// Gets a shared reference to a checked-out object.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an object checked out of this pool.
    #[must_use]
    pub fn get(&self, handle: Handle) -> &T {
        let object = self
            .object_of(handle)
            .expect("handle was not associated with a checked-out object in the pool");

        // SAFETY: Objects in the arena stay constructed until the pool destroys them, which
        // requires an exclusive reference to the pool. We hold a shared one.
        unsafe { object.as_ref() }
    }

    /// Gets an exclusive reference to a checked-out object.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let mut pool = Pool::<String>::new(1, false).unwrap();
    /// let handle = pool.checkout().unwrap().unwrap();
    ///
    /// pool.get_mut(handle).push_str("Hello");
    /// assert_eq!(pool.get(handle), "Hello");
    /// # pool.release(handle).unwrap();
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an object checked out of this pool.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        let mut object = self
            .object_of(handle)
            .expect("handle was not associated with a checked-out object in the pool");

        // SAFETY: Objects in the arena stay constructed until the pool destroys them and the
        // pool never hands out references other than through `&self`/`&mut self` borrows,
        // so our exclusive borrow of the pool makes this reference exclusive, too.
        unsafe { object.as_mut() }
    }

    /// Whether the handle refers to an object currently checked out of this pool.
    #[must_use]
    pub fn is_checked_out(&self, handle: Handle) -> bool {
        self.object_of(handle).is_some()
    }

    /// The number of objects that exist, whether free or checked out.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// The ceiling on [`capacity()`][Self::capacity].
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Changes the ceiling on [`capacity()`][Self::capacity].
    ///
    /// Lowering the ceiling below the current capacity does not destroy any objects right away.
    /// Each later [`release()`][Self::release] destroys the returned object instead of
    /// recycling it, until the capacity is back at the ceiling.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let mut pool = Pool::<u64>::new(3, false).unwrap();
    /// let a = pool.checkout().unwrap().unwrap();
    /// let b = pool.checkout().unwrap().unwrap();
    ///
    /// pool.set_max_capacity(1);
    /// assert_eq!(pool.capacity(), 3);
    ///
    /// pool.release(a).unwrap();
    /// assert_eq!(pool.capacity(), 2);
    ///
    /// pool.release(b).unwrap();
    /// assert_eq!(pool.capacity(), 1);
    /// ```
    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.max_capacity = max_capacity;
    }

    /// Whether the pool may allocate new objects when no free object is left.
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    /// Sets whether the pool may allocate new objects when no free object is left.
    pub fn set_expandable(&mut self, expandable: bool) {
        self.expandable = expandable;
    }

    /// Whether a free object is available for checkout without allocating.
    #[must_use]
    pub fn has_available(&self) -> bool {
        self.arena.free_len() > 0
    }

    /// The number of free objects.
    #[must_use]
    pub fn available(&self) -> usize {
        self.arena.free_len()
    }

    /// The number of checked-out objects.
    #[must_use]
    pub fn checked_out(&self) -> usize {
        self.arena.checked_out_len()
    }

    /// Whether new objects are cloned from a prototype rather than default-constructed.
    #[must_use]
    pub fn has_prototype(&self) -> bool {
        self.initializer.prototype().is_some()
    }

    /// The prototype new objects are cloned from, if any.
    #[must_use]
    pub fn prototype(&self) -> Option<&T> {
        self.initializer.prototype()
    }

    /// The allocation strategy of the pool.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// What happens to checked-out objects when the pool is dropped.
    #[must_use]
    pub fn drop_policy(&self) -> DropPolicy {
        self.drop_policy
    }

    /// Destroys free objects until the capacity is no greater than the ceiling or there are no
    /// free objects left.
    ///
    /// Checked-out objects are never affected; they are evicted when they are returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::Pool;
    ///
    /// let mut pool = Pool::<u64>::new(4, false).unwrap();
    /// let handle = pool.checkout().unwrap().unwrap();
    ///
    /// pool.set_max_capacity(2);
    /// pool.shrink_to_fit();
    ///
    /// assert_eq!(pool.capacity(), 2);
    /// assert_eq!(pool.available(), 1);
    /// assert!(pool.is_checked_out(handle));
    /// # pool.release(handle).unwrap();
    /// ```
    pub fn shrink_to_fit(&mut self) {
        let mut destroyed: usize = 0;

        while self.capacity() > self.max_capacity {
            let Some(object) = self.arena.remove_top_free() else {
                break;
            };

            self.destroy_object(object);

            destroyed = destroyed
                .checked_add(1)
                .expect("cannot destroy more objects than virtual memory can fit");
        }

        if destroyed > 0 {
            debug!(
                item_type = type_name::<T>(),
                destroyed,
                capacity = self.capacity(),
                max_capacity = self.max_capacity,
                "shrank object pool"
            );
        }
    }

    /// Verifies that no object is checked out, so the pool can be dropped without destroying
    /// anything a caller is still using.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectInUse`] if any object is still checked out.
    ///
    /// # Examples
    ///
    /// ```
    /// use reuse_pool::{Error, Pool};
    ///
    /// let mut pool = Pool::<u64>::new(1, false).unwrap();
    /// let handle = pool.checkout().unwrap().unwrap();
    ///
    /// assert!(matches!(
    ///     pool.deletion_check(),
    ///     Err(Error::ObjectInUse { count: 1 })
    /// ));
    ///
    /// pool.release(handle).unwrap();
    /// pool.deletion_check().unwrap();
    /// ```
    pub fn deletion_check(&self) -> Result<()> {
        match self.arena.checked_out_len() {
            0 => Ok(()),
            count => Err(Error::ObjectInUse { count }),
        }
    }

    /// Resolves a handle to the arena index of a checked-out object.
    pub(crate) fn checked_out_index(&self, handle: Handle) -> Result<usize> {
        if handle.pool_id != self.pool_id {
            return Err(Error::UnknownHandle { handle });
        }

        match self.arena.state(handle.index) {
            SlotState::CheckedOut => Ok(handle.index),
            SlotState::Free => Err(Error::NotCheckedOut { handle }),
            SlotState::Unknown => Err(Error::UnknownHandle { handle }),
        }
    }

    /// Recycles or evicts the checked-out object at `index`, which the caller has validated.
    pub(crate) fn release_index(&mut self, index: usize) {
        if self.capacity() > self.max_capacity {
            let object = self.arena.remove_checked_out(index);
            self.destroy_object(object);

            debug!(
                item_type = type_name::<T>(),
                capacity = self.capacity(),
                max_capacity = self.max_capacity,
                "evicted returned object from over-capacity pool"
            );
        } else {
            self.arena.check_in(index);
        }

        #[cfg(debug_assertions)]
        self.arena.integrity_check();
    }

    fn can_expand(&self) -> bool {
        self.expandable && self.capacity() < self.max_capacity
    }

    fn handle(&self, index: usize) -> Handle {
        Handle {
            pool_id: self.pool_id,
            index,
        }
    }

    fn object_of(&self, handle: Handle) -> Option<NonNull<T>> {
        if handle.pool_id != self.pool_id {
            return None;
        }

        self.arena.checked_out_object(handle.index)
    }

    fn allocate_object(&mut self) -> Result<NonNull<T>> {
        let value = self.initializer.create();
        let object = self.allocator.allocate()?;

        // SAFETY: The storage was just obtained from the same allocator and is uninitialized.
        unsafe {
            self.allocator.construct(object, value);
        }

        Ok(object)
    }

    fn destroy_object(&mut self, object: NonNull<T>) {
        // SAFETY: The object came out of the arena, so it was constructed by `allocate_object()`
        // with this allocator and nobody can reach it through the pool anymore.
        unsafe {
            self.allocator.destroy(object);
        }

        // SAFETY: Same allocator, and the object was destroyed above.
        unsafe {
            self.allocator.deallocate(object);
        }
    }
}

impl<T, A: ObjectAllocator<T>> Drop for Pool<T, A> {
    fn drop(&mut self) {
        let checked_out = self.arena.checked_out_len();

        for object in self.arena.drain() {
            self.destroy_object(object);
        }

        // We do this check at the end so we clean up the memory first.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropCheckedOut && !thread::panicking() {
            assert!(
                checked_out == 0,
                "dropped a pool of {} with {checked_out} checked-out object(s) with a policy that says none may be checked out when dropped",
                type_name::<T>()
            );
        }
    }
}

impl<T, A: ObjectAllocator<T>> fmt::Debug for Pool<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity())
            .field("max_capacity", &self.max_capacity)
            .field("available", &self.available())
            .field("checked_out", &self.checked_out())
            .field("expandable", &self.expandable)
            .field("initializer", &self.initializer)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

// SAFETY: The raw pointers in the arena are exclusively owned by the pool and nothing about them
// is tied to a particular thread, so as long as the objects and the allocator can move between
// threads, the pool can do so, too.
unsafe impl<T: Send, A: ObjectAllocator<T> + Send> Send for Pool<T, A> {}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::undocumented_unsafe_blocks,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::AllocError;

    assert_impl_all!(Pool<u32>: Send);
    assert_not_impl_any!(Pool<u32>: Sync);
    assert_not_impl_any!(Pool<Rc<u32>>: Send);
    assert_impl_all!(Handle: Send, Sync, Copy);

    /// Allocates from the global allocator until `remaining` runs out, then fails.
    #[derive(Debug)]
    struct LimitedAllocator {
        remaining: usize,
        live: Rc<Cell<usize>>,
    }

    impl LimitedAllocator {
        fn new(remaining: usize) -> Self {
            Self {
                remaining,
                live: Rc::new(Cell::new(0)),
            }
        }
    }

    impl<T> ObjectAllocator<T> for LimitedAllocator {
        fn allocate(&mut self) -> std::result::Result<NonNull<T>, AllocError> {
            if self.remaining == 0 {
                return Err(AllocError::new(std::alloc::Layout::new::<T>()));
            }

            self.remaining -= 1;
            let ptr = ObjectAllocator::<T>::allocate(&mut GlobalAllocator)?;
            self.live.set(self.live.get() + 1);
            Ok(ptr)
        }

        unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
            self.live.set(self.live.get() - 1);
            unsafe { GlobalAllocator.deallocate(ptr) };
        }
    }

    /// Records every destructor call in a shared log.
    struct Tracked {
        id: usize,
        log: Rc<RefCell<Vec<usize>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.id);
        }
    }

    fn assert_consistent<T, A: ObjectAllocator<T>>(pool: &Pool<T, A>) {
        assert_eq!(pool.capacity(), pool.available() + pool.checked_out());

        #[cfg(debug_assertions)]
        pool.arena.integrity_check();
    }

    #[test]
    fn smoke_test() {
        let mut pool = Pool::<u32>::new(3, false).unwrap();

        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.checked_out(), 0);
        assert!(pool.has_available());

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();

        *pool.get_mut(a) = 42;
        *pool.get_mut(b) = 43;

        assert_eq!(*pool.get(a), 42);
        assert_eq!(*pool.get(b), 43);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.checked_out(), 2);
        assert_consistent(&pool);

        pool.release(a).unwrap();
        pool.release(b).unwrap();

        assert_eq!(pool.available(), 3);
        assert_consistent(&pool);
        pool.deletion_check().unwrap();
    }

    #[test]
    fn non_expandable_pool_runs_out() {
        let mut pool = Pool::<u32>::new(2, false).unwrap();

        let a = pool.checkout().unwrap();
        let b = pool.checkout().unwrap();

        assert!(a.is_some());
        assert!(b.is_some());
        assert_ne!(a, b);

        assert_eq!(pool.checkout().unwrap(), None);
        assert!(!pool.has_available());
        assert_consistent(&pool);
    }

    #[test]
    fn non_expandable_ignores_raised_ceiling() {
        let mut pool = Pool::<u32>::new(1, false).unwrap();
        pool.set_max_capacity(10);

        _ = pool.checkout().unwrap().unwrap();

        assert_eq!(pool.checkout().unwrap(), None);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn expandable_pool_grows_up_to_ceiling() {
        let mut pool = Pool::<u32>::new(1, true).unwrap();
        pool.set_max_capacity(3);

        let handles = (0..3)
            .map(|_| pool.checkout().unwrap().unwrap())
            .collect::<HashSet<_>>();

        assert_eq!(handles.len(), 3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.checkout().unwrap(), None);
        assert_consistent(&pool);
    }

    #[test]
    fn expansion_can_be_switched_off() {
        let mut pool = Pool::<u32>::new(0, true).unwrap();
        pool.set_max_capacity(5);
        pool.set_expandable(false);

        assert!(!pool.is_expandable());
        assert_eq!(pool.checkout().unwrap(), None);

        pool.set_expandable(true);
        assert!(pool.checkout().unwrap().is_some());
    }

    #[test]
    fn reuse_is_last_in_first_out() {
        let mut pool = Pool::<u32>::new(3, false).unwrap();

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();
        let c = pool.checkout().unwrap().unwrap();

        pool.release(b).unwrap();
        pool.release(a).unwrap();
        pool.release(c).unwrap();

        assert_eq!(pool.checkout().unwrap(), Some(c));
        assert_eq!(pool.checkout().unwrap(), Some(a));
        assert_eq!(pool.checkout().unwrap(), Some(b));
    }

    #[test]
    fn recycled_object_keeps_its_state() {
        let mut pool = Pool::<String>::new(1, false).unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.get_mut(handle).push_str("dirty");
        pool.release(handle).unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        assert_eq!(pool.get(handle), "dirty");
    }

    #[test]
    fn prototype_initializes_every_object() {
        let mut pool = Pool::builder_with_prototype(7_u32)
            .size(1)
            .expandable(true)
            .build()
            .unwrap();
        pool.set_max_capacity(2);

        assert!(pool.has_prototype());
        assert_eq!(pool.prototype(), Some(&7));

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();

        assert_eq!(*pool.get(a), 7);
        assert_eq!(*pool.get(b), 7);
    }

    #[test]
    fn lowered_ceiling_evicts_on_release() {
        let mut pool = Pool::<u32>::new(4, false).unwrap();

        let handles = (0..4)
            .map(|_| pool.checkout().unwrap().unwrap())
            .collect::<Vec<_>>();

        pool.set_max_capacity(1);
        assert_eq!(pool.capacity(), 4);

        for (released, handle) in handles.iter().enumerate() {
            pool.release(*handle).unwrap();
            assert_consistent(&pool);

            if released < 3 {
                assert_eq!(pool.capacity(), 3 - released);
                assert_eq!(pool.available(), 0);
            }
        }

        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn lowered_ceiling_keeps_free_objects_until_shrink() {
        let mut pool = Pool::<u32>::new(4, false).unwrap();

        pool.set_max_capacity(1);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.available(), 4);

        pool.shrink_to_fit();
        assert_eq!(pool.capacity(), 1);
        assert_consistent(&pool);
    }

    #[test]
    fn evicted_handle_is_unknown() {
        let mut pool = Pool::<u32>::new(2, false).unwrap();

        let a = pool.checkout().unwrap().unwrap();
        pool.set_max_capacity(1);
        pool.release(a).unwrap();

        assert!(!pool.is_checked_out(a));
        assert!(matches!(pool.release(a), Err(Error::UnknownHandle { .. })));
    }

    #[test]
    fn double_release_is_error() {
        let mut pool = Pool::<u32>::new(1, false).unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.release(handle).unwrap();

        assert!(matches!(
            pool.release(handle),
            Err(Error::NotCheckedOut { handle: h }) if h == handle
        ));
        assert_consistent(&pool);
    }

    #[test]
    fn foreign_handle_is_unknown() {
        let mut pool_a = Pool::<u32>::new(1, false).unwrap();
        let mut pool_b = Pool::<u32>::new(1, false).unwrap();

        let handle = pool_a.checkout().unwrap().unwrap();
        _ = pool_b.checkout().unwrap().unwrap();

        assert!(!pool_b.is_checked_out(handle));
        assert!(matches!(
            pool_b.release(handle),
            Err(Error::UnknownHandle { .. })
        ));
    }

    #[test]
    #[should_panic]
    fn get_free_object_panics() {
        let mut pool = Pool::<u32>::new(1, false).unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.release(handle).unwrap();

        _ = pool.get(handle);
    }

    #[test]
    #[should_panic]
    fn get_mut_foreign_handle_panics() {
        let mut pool_a = Pool::<u32>::new(1, false).unwrap();
        let mut pool_b = Pool::<u32>::new(1, false).unwrap();

        let handle = pool_a.checkout().unwrap().unwrap();

        _ = pool_b.get_mut(handle);
    }

    #[test]
    fn deletion_check_counts_outstanding() {
        let mut pool = Pool::<u32>::new(3, false).unwrap();

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();

        assert!(matches!(
            pool.deletion_check(),
            Err(Error::ObjectInUse { count: 2 })
        ));

        pool.release(a).unwrap();
        pool.release(b).unwrap();

        pool.deletion_check().unwrap();
    }

    #[test]
    fn build_failure_releases_partial_batch() {
        let allocator = LimitedAllocator::new(2);
        let live = Rc::clone(&allocator.live);

        let result = Pool::<u64>::builder()
            .size(3)
            .allocator(allocator)
            .build();

        assert!(matches!(result, Err(Error::Allocation(_))));
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn expansion_failure_is_error_not_exhaustion() {
        let mut pool = Pool::<u64>::builder()
            .size(1)
            .expandable(true)
            .allocator(LimitedAllocator::new(1))
            .build()
            .unwrap();
        pool.set_max_capacity(2);

        _ = pool.checkout().unwrap().unwrap();

        assert!(matches!(pool.checkout(), Err(Error::Allocation(_))));
        assert_eq!(pool.capacity(), 1);
        assert_consistent(&pool);
    }

    #[test]
    fn drop_destroys_free_and_checked_out_objects() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let allocator = LimitedAllocator::new(usize::MAX);
        let live = Rc::clone(&allocator.live);

        {
            let mut pool = Pool::<Option<Tracked>>::builder()
                .size(3)
                .allocator(allocator)
                .build()
                .unwrap();

            let handles = (0..2)
                .map(|_| pool.checkout().unwrap().unwrap())
                .collect::<Vec<_>>();

            for (id, handle) in handles.iter().enumerate() {
                *pool.get_mut(*handle) = Some(Tracked {
                    id,
                    log: Rc::clone(&log),
                });
            }

            // One goes back to the free set, the other stays checked out.
            pool.release(handles[0]).unwrap();

            assert_eq!(live.get(), 3);
            assert!(log.borrow().is_empty());
        }

        assert_eq!(live.get(), 0);

        let mut dropped = log.borrow().clone();
        dropped.sort_unstable();
        assert_eq!(dropped, vec![0, 1]);
    }

    #[test]
    fn eviction_destroys_through_allocator() {
        let allocator = LimitedAllocator::new(usize::MAX);
        let live = Rc::clone(&allocator.live);

        let mut pool = Pool::<u64>::builder()
            .size(2)
            .allocator(allocator)
            .build()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.set_max_capacity(1);
        pool.release(handle).unwrap();

        assert_eq!(live.get(), 1);
        assert_eq!(pool.allocator().remaining, usize::MAX - 2);
    }

    /// Performs every step through the global allocator and logs which step ran.
    #[derive(Debug, Default)]
    struct LoggingAllocator {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl<T> ObjectAllocator<T> for LoggingAllocator {
        fn allocate(&mut self) -> std::result::Result<NonNull<T>, AllocError> {
            self.log.borrow_mut().push("allocate");
            ObjectAllocator::<T>::allocate(&mut GlobalAllocator)
        }

        unsafe fn construct(&mut self, ptr: NonNull<T>, value: T) {
            self.log.borrow_mut().push("construct");
            unsafe { ptr.write(value) };
        }

        unsafe fn destroy(&mut self, ptr: NonNull<T>) {
            self.log.borrow_mut().push("destroy");
            unsafe { ptr.drop_in_place() };
        }

        unsafe fn deallocate(&mut self, ptr: NonNull<T>) {
            self.log.borrow_mut().push("deallocate");
            unsafe { GlobalAllocator.deallocate(ptr) };
        }
    }

    #[test]
    fn every_allocator_step_is_used_in_order() {
        let allocator = LoggingAllocator::default();
        let log = Rc::clone(&allocator.log);

        let mut pool = Pool::<String>::builder()
            .size(2)
            .allocator(allocator)
            .build()
            .unwrap();

        assert_eq!(
            *log.borrow(),
            ["allocate", "construct", "allocate", "construct"]
        );
        log.borrow_mut().clear();

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();
        pool.get_mut(a).push_str("evicted");
        pool.get_mut(b).push_str("still out");

        // Checking out existing objects does not touch the allocator.
        assert!(log.borrow().is_empty());

        pool.set_max_capacity(1);
        pool.release(a).unwrap();

        assert_eq!(*log.borrow(), ["destroy", "deallocate"]);
        log.borrow_mut().clear();

        // Recycling does not touch the allocator either.
        pool.set_max_capacity(2);
        pool.release(b).unwrap();
        let c = pool.checkout().unwrap().unwrap();
        assert_eq!(pool.get(c), "still out");
        assert!(log.borrow().is_empty());

        pool.set_expandable(true);
        _ = pool.checkout().unwrap().unwrap();

        assert_eq!(*log.borrow(), ["allocate", "construct"]);
        log.borrow_mut().clear();

        drop(pool);

        assert_eq!(
            *log.borrow(),
            ["destroy", "deallocate", "destroy", "deallocate"]
        );
    }

    #[test]
    fn drop_with_nothing_checked_out_does_not_panic_if_policy_must_not_drop() {
        let mut pool = Pool::<u64>::builder()
            .size(2)
            .drop_policy(DropPolicy::MustNotDropCheckedOut)
            .build()
            .unwrap();

        let handle = pool.checkout().unwrap().unwrap();
        pool.release(handle).unwrap();

        drop(pool);
    }

    #[test]
    #[should_panic]
    fn drop_with_checked_out_panics_if_policy_must_not_drop() {
        let mut pool = Pool::<u64>::builder()
            .size(2)
            .drop_policy(DropPolicy::MustNotDropCheckedOut)
            .build()
            .unwrap();

        _ = pool.checkout().unwrap().unwrap();

        drop(pool);
    }

    #[test]
    fn zero_sized_items_are_pooled() {
        let mut pool = Pool::<()>::new(2, false).unwrap();

        let a = pool.checkout().unwrap().unwrap();
        let b = pool.checkout().unwrap().unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.checkout().unwrap(), None);

        pool.release(a).unwrap();
        pool.release(b).unwrap();
    }

    #[test]
    fn debug_output_names_item_type() {
        let pool = Pool::<u16>::new(1, false).unwrap();

        let output = format!("{pool:?}");

        assert!(output.contains("u16"));
        assert!(output.contains("max_capacity"));
    }
}
