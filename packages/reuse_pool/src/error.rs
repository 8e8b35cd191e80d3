use std::alloc::Layout;

use thiserror::Error;

use crate::Handle;

/// Errors that can occur when operating a [`Pool`][crate::Pool] or
/// [`LifecyclePool`][crate::LifecyclePool].
///
/// An exhausted pool and a return refused because the object is still active are not errors;
/// they are reported through `Ok(None)` and `Ok(false)` respectively.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool was asked to confirm that it can be torn down but some objects are still
    /// checked out. Return them to the pool and try again.
    #[error("{count} pooled object(s) are still checked out")]
    ObjectInUse {
        /// How many objects were checked out at the time of the check.
        count: usize,
    },

    /// The allocation strategy could not provide storage for a new object.
    #[error(transparent)]
    Allocation(#[from] AllocError),

    /// The handle does not refer to any object owned by the pool. It was either issued by a
    /// different pool or its object has since been evicted.
    #[error("{handle:?} does not refer to an object owned by this pool")]
    UnknownHandle {
        /// The rejected handle.
        handle: Handle,
    },

    /// The handle refers to an object that is not checked out, typically because it has
    /// already been returned.
    #[error("{handle:?} refers to an object that is not checked out")]
    NotCheckedOut {
        /// The rejected handle.
        handle: Handle,
    },
}

/// Failure of an [`ObjectAllocator`][crate::ObjectAllocator] to provide storage for one object.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error(
    "failed to allocate {} bytes (alignment {}) for a pooled object",
    layout.size(),
    layout.align()
)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    /// Creates an error describing a failed allocation of the given layout.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The memory layout that could not be allocated.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);
    assert_impl_all!(AllocError: Send, Sync, Debug, Copy);

    #[test]
    fn object_in_use_mentions_count() {
        let error = Error::ObjectInUse { count: 3 };

        assert!(error.to_string().contains('3'));
    }

    #[test]
    fn alloc_error_is_transparent() {
        let layout = Layout::new::<u64>();
        let error = Error::from(AllocError::new(layout));

        assert!(matches!(error, Error::Allocation(inner) if inner.layout() == layout));
        assert_eq!(error.to_string(), AllocError::new(layout).to_string());
    }
}
