/// An object that wants to know when it is checked out of and returned to a
/// [`LifecyclePool`][crate::LifecyclePool].
///
/// Implementors carry an activity flag that must start out `false`. The pool never changes the
/// flag itself; it only refuses to take an object back while the flag is `true`. By convention,
/// the object (or its user) raises the flag in [`on_checkout()`][Self::on_checkout] or right
/// after checkout and lowers it once the work is done.
///
/// # Examples
///
/// ```
/// use reuse_pool::Poolable;
///
/// #[derive(Clone, Debug, Default)]
/// struct Connection {
///     active: bool,
///     bytes_sent: usize,
/// }
///
/// impl Poolable for Connection {
///     fn is_active(&self) -> bool {
///         self.active
///     }
///
///     fn set_active(&mut self, active: bool) {
///         self.active = active;
///     }
///
///     fn on_return(&mut self) {
///         self.bytes_sent = 0;
///     }
/// }
/// ```
pub trait Poolable {
    /// Whether the object is in use. An active object cannot be returned to the pool.
    fn is_active(&self) -> bool;

    /// Sets the activity flag.
    fn set_active(&mut self, active: bool);

    /// Called after the object has been checked out, before the caller receives its handle.
    fn on_checkout(&mut self) {}

    /// Called once when the object is returned, before it is either recycled or destroyed.
    ///
    /// This is the place to reset internal state.
    fn on_return(&mut self) {}
}
