use std::any::type_name;
use std::mem;
use std::ptr::NonNull;

/// This is the bookkeeping storage of a `Pool`. It knows which slot holds which object and
/// whether that object is free or checked out, but it never creates, destroys or dereferences
/// the objects themselves - that is the job of the pool and its allocator.
///
/// Slots are addressed by index and indices are stable for as long as the slot is occupied.
/// A slot becomes vacant when its object is evicted; vacant slots are filled again before the
/// slot vector grows.
///
/// Free slots are kept on a stack, so the most recently returned object is the next one to be
/// handed out.
///
/// Dropping the arena does not release the objects. The owner must [`drain()`][Self::drain]
/// the arena first.
#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    slots: Vec<Slot<T>>,

    /// Indexes of slots in the `Free` state, most recently freed last.
    free: Vec<usize>,

    /// Indexes of slots in the `Vacant` state, most recently vacated last.
    vacant: Vec<usize>,

    /// Number of slots in the `CheckedOut` state.
    checked_out: usize,
}

#[derive(Debug)]
enum Slot<T> {
    Vacant,
    Free { object: NonNull<T> },
    CheckedOut { object: NonNull<T> },
}

/// What an index points at, as seen from outside the arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SlotState {
    /// The index is beyond the end of the arena or the slot holds no object.
    Unknown,
    Free,
    CheckedOut,
}

impl<T> SlotArena<T> {
    #[must_use]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            checked_out: 0,
        }
    }

    /// The number of objects held by the arena, whether free or checked out.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.free
            .len()
            .checked_add(self.checked_out)
            .expect("cannot hold more objects than virtual memory can fit")
    }

    #[must_use]
    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub(crate) fn checked_out_len(&self) -> usize {
        self.checked_out
    }

    #[must_use]
    pub(crate) fn state(&self, index: usize) -> SlotState {
        match self.slots.get(index) {
            None | Some(Slot::Vacant) => SlotState::Unknown,
            Some(Slot::Free { .. }) => SlotState::Free,
            Some(Slot::CheckedOut { .. }) => SlotState::CheckedOut,
        }
    }

    /// The object in a checked-out slot, if the slot at `index` is checked out.
    #[must_use]
    pub(crate) fn checked_out_object(&self, index: usize) -> Option<NonNull<T>> {
        match self.slots.get(index) {
            Some(Slot::CheckedOut { object }) => Some(*object),
            _ => None,
        }
    }

    /// Adds a new object to the top of the free stack.
    pub(crate) fn insert_free(&mut self, object: NonNull<T>) -> usize {
        let index = self.occupy(Slot::Free { object });
        self.free.push(index);
        index
    }

    /// Adds a new object directly in the checked-out state.
    pub(crate) fn insert_checked_out(&mut self, object: NonNull<T>) -> usize {
        let index = self.occupy(Slot::CheckedOut { object });
        self.increment_checked_out();
        index
    }

    /// Moves the most recently freed object to the checked-out state and returns its index.
    ///
    /// Returns `None` if there are no free objects.
    #[must_use]
    pub(crate) fn check_out_top(&mut self) -> Option<usize> {
        let index = self.free.pop()?;

        let slot = self
            .slots
            .get_mut(index)
            .expect("free stack only contains indexes of existing slots");

        let Slot::Free { object } = *slot else {
            panic!(
                "free stack pointed at slot {index} that was not free in arena of {}",
                type_name::<T>()
            );
        };

        *slot = Slot::CheckedOut { object };
        self.increment_checked_out();

        Some(index)
    }

    /// Moves a checked-out object back to the top of the free stack.
    ///
    /// # Panics
    ///
    /// Panics if the slot at `index` is not checked out.
    pub(crate) fn check_in(&mut self, index: usize) {
        let object = self.release_checked_out(index, "check_in");

        let slot = self
            .slots
            .get_mut(index)
            .expect("release_checked_out verified the slot exists");
        *slot = Slot::Free { object };

        self.free.push(index);
    }

    /// Removes a checked-out object from the arena, leaving its slot vacant, and hands the
    /// object to the caller for destruction.
    ///
    /// # Panics
    ///
    /// Panics if the slot at `index` is not checked out.
    #[must_use]
    pub(crate) fn remove_checked_out(&mut self, index: usize) -> NonNull<T> {
        let object = self.release_checked_out(index, "remove_checked_out");
        self.vacate(index);
        object
    }

    /// Removes the object at the top of the free stack from the arena, leaving its slot vacant,
    /// and hands the object to the caller for destruction.
    #[must_use]
    pub(crate) fn remove_top_free(&mut self) -> Option<NonNull<T>> {
        let index = self.free.pop()?;

        let Some(Slot::Free { object }) = self.slots.get(index) else {
            panic!(
                "free stack pointed at slot {index} that was not free in arena of {}",
                type_name::<T>()
            );
        };
        let object = *object;

        self.vacate(index);
        Some(object)
    }

    /// Empties the arena, handing every object it held (free or checked out) to the caller.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = NonNull<T>> + use<T> {
        self.free.clear();
        self.vacant.clear();
        self.checked_out = 0;

        mem::take(&mut self.slots)
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Vacant => None,
                Slot::Free { object } | Slot::CheckedOut { object } => Some(object),
            })
    }

    fn occupy(&mut self, slot: Slot<T>) -> usize {
        if let Some(index) = self.vacant.pop() {
            *self
                .slots
                .get_mut(index)
                .expect("vacant stack only contains indexes of existing slots") = slot;
            return index;
        }

        self.slots.push(slot);

        self.slots
            .len()
            .checked_sub(1)
            .expect("we just pushed a slot, so this cannot overflow because len >= 1")
    }

    fn vacate(&mut self, index: usize) {
        *self
            .slots
            .get_mut(index)
            .expect("callers only vacate slots that exist") = Slot::Vacant;
        self.vacant.push(index);
    }

    fn release_checked_out(&mut self, index: usize, operation: &str) -> NonNull<T> {
        let Some(Slot::CheckedOut { object }) = self.slots.get(index) else {
            panic!(
                "{operation}({index}) slot was not checked out in arena of {}",
                type_name::<T>()
            );
        };
        let object = *object;

        self.checked_out = self
            .checked_out
            .checked_sub(1)
            .expect("we verified above that the slot is checked out so count must be non-zero");

        object
    }

    fn increment_checked_out(&mut self) {
        self.checked_out = self
            .checked_out
            .checked_add(1)
            .expect("cannot hold more objects than virtual memory can fit");
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let mut observed_free: usize = 0;
        let mut observed_checked_out: usize = 0;
        let mut observed_vacant: usize = 0;

        for slot in &self.slots {
            let counter = match slot {
                Slot::Vacant => &mut observed_vacant,
                Slot::Free { .. } => &mut observed_free,
                Slot::CheckedOut { .. } => &mut observed_checked_out,
            };

            *counter = counter
                .checked_add(1)
                .expect("guarded by slot vector length");
        }

        assert!(
            self.checked_out == observed_checked_out,
            "self.checked_out {} does not match the observed checked out count {} in arena of {}",
            self.checked_out,
            observed_checked_out,
            type_name::<T>()
        );

        assert!(
            self.free.len() == observed_free,
            "free stack length {} does not match the observed free count {} in arena of {}",
            self.free.len(),
            observed_free,
            type_name::<T>()
        );

        assert!(
            self.vacant.len() == observed_vacant,
            "vacant stack length {} does not match the observed vacant count {} in arena of {}",
            self.vacant.len(),
            observed_vacant,
            type_name::<T>()
        );

        for &index in &self.free {
            assert!(
                matches!(self.slots.get(index), Some(Slot::Free { .. })),
                "free stack entry {index} does not point at a free slot in arena of {}",
                type_name::<T>()
            );
        }

        for &index in &self.vacant {
            assert!(
                matches!(self.slots.get(index), Some(Slot::Vacant)),
                "vacant stack entry {index} does not point at a vacant slot in arena of {}",
                type_name::<T>()
            );
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::indexing_slicing,
    reason = "we do not need to worry about these things when writing test code"
)]
mod tests {
    use super::*;

    fn fake_object(n: usize) -> NonNull<u64> {
        // The arena never dereferences its pointers, so any non-null address will do.
        NonNull::new(std::ptr::without_provenance_mut::<u64>(n)).unwrap()
    }

    #[test]
    fn smoke_test() {
        let mut arena = SlotArena::<u64>::with_capacity(2);

        assert_eq!(arena.len(), 0);

        let a = arena.insert_free(fake_object(8));
        let b = arena.insert_free(fake_object(16));

        assert_eq!(arena.len(), 2);
        assert_eq!(arena.free_len(), 2);
        assert_eq!(arena.state(a), SlotState::Free);

        // Most recently inserted goes out first.
        assert_eq!(arena.check_out_top(), Some(b));
        assert_eq!(arena.state(b), SlotState::CheckedOut);
        assert_eq!(arena.checked_out_object(b), Some(fake_object(16)));
        assert_eq!(arena.checked_out_len(), 1);
        assert_eq!(arena.len(), 2);

        arena.check_in(b);
        assert_eq!(arena.state(b), SlotState::Free);
        assert_eq!(arena.checked_out_object(b), None);

        #[cfg(debug_assertions)]
        arena.integrity_check();
    }

    #[test]
    fn returned_slot_is_reused_first() {
        let mut arena = SlotArena::<u64>::with_capacity(3);

        for n in 1..=3 {
            _ = arena.insert_free(fake_object(n * 8));
        }

        let first = arena.check_out_top().unwrap();
        let second = arena.check_out_top().unwrap();

        arena.check_in(first);
        arena.check_in(second);

        assert_eq!(arena.check_out_top(), Some(second));
        assert_eq!(arena.check_out_top(), Some(first));

        #[cfg(debug_assertions)]
        arena.integrity_check();
    }

    #[test]
    fn vacated_slot_is_filled_before_growing() {
        let mut arena = SlotArena::<u64>::with_capacity(2);

        let a = arena.insert_checked_out(fake_object(8));
        let _b = arena.insert_checked_out(fake_object(16));

        assert_eq!(arena.remove_checked_out(a), fake_object(8));
        assert_eq!(arena.state(a), SlotState::Unknown);
        assert_eq!(arena.len(), 1);

        let c = arena.insert_free(fake_object(24));
        assert_eq!(c, a);
        assert_eq!(arena.len(), 2);

        #[cfg(debug_assertions)]
        arena.integrity_check();
    }

    #[test]
    fn remove_top_free_takes_most_recent() {
        let mut arena = SlotArena::<u64>::with_capacity(2);

        _ = arena.insert_free(fake_object(8));
        let b = arena.insert_free(fake_object(16));

        assert_eq!(arena.remove_top_free(), Some(fake_object(16)));
        assert_eq!(arena.state(b), SlotState::Unknown);
        assert_eq!(arena.free_len(), 1);

        assert!(arena.remove_top_free().is_some());
        assert_eq!(arena.remove_top_free(), None);

        #[cfg(debug_assertions)]
        arena.integrity_check();
    }

    #[test]
    fn drain_yields_free_and_checked_out() {
        let mut arena = SlotArena::<u64>::with_capacity(3);

        _ = arena.insert_free(fake_object(8));
        _ = arena.insert_free(fake_object(16));
        let c = arena.insert_checked_out(fake_object(24));
        _ = arena.remove_checked_out(c);
        _ = arena.insert_checked_out(fake_object(32));

        let mut drained = arena.drain().collect::<Vec<_>>();
        drained.sort();

        assert_eq!(
            drained,
            vec![fake_object(8), fake_object(16), fake_object(32)]
        );
        assert_eq!(arena.len(), 0);
        assert_eq!(arena.state(0), SlotState::Unknown);

        #[cfg(debug_assertions)]
        arena.integrity_check();
    }

    #[test]
    fn out_of_range_is_unknown() {
        let arena = SlotArena::<u64>::with_capacity(0);

        assert_eq!(arena.state(42), SlotState::Unknown);
        assert_eq!(arena.checked_out_object(42), None);
    }

    #[test]
    #[should_panic]
    fn check_in_free_slot_panics() {
        let mut arena = SlotArena::<u64>::with_capacity(1);

        let a = arena.insert_free(fake_object(8));
        arena.check_in(a);
    }
}
