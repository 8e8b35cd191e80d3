/// Determines how the pool treats objects that are still checked out when the pool is dropped.
///
/// The pool owns every object it ever allocated, including the ones currently lent out through a
/// [`Handle`][crate::Handle]. Dropping the pool always destroys all of them; the policy only
/// decides whether doing so while objects are checked out is acceptable.
///
/// # Examples
///
/// ```
/// use reuse_pool::{DropPolicy, Pool};
///
/// let pool = Pool::<u32>::builder()
///     .size(4)
///     .drop_policy(DropPolicy::MustNotDropCheckedOut)
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.drop_policy(), DropPolicy::MustNotDropCheckedOut);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Checked-out objects are destroyed together with the free ones. This is the default.
    #[default]
    MayDropCheckedOut,

    /// The pool will panic on drop if any object is still checked out.
    ///
    /// Use this when outstanding handles signal a bookkeeping bug, for example when every
    /// checkout is expected to be paired with a return before teardown. This is the drop-time
    /// equivalent of calling [`Pool::deletion_check()`][crate::Pool::deletion_check] and
    /// treating a failure as fatal.
    MustNotDropCheckedOut,
}
