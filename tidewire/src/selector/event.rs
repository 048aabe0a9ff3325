/// Readiness reported by the selector for one registration.
///
/// A `Readiness` is produced by [`Selector::select`] and consumed by the
/// dispatcher, usually through [`Responder::dispatch`].
///
/// The selector cannot tell a completed connect apart from a writable
/// socket. The responder resolves that using its current interest set.
///
/// [`Selector::select`]: crate::Selector::select
/// [`Responder::dispatch`]: crate::Responder::dispatch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    /// Token the registration was created with.
    pub token: usize,

    /// The descriptor has data to read, or has hung up.
    pub readable: bool,

    /// The descriptor can accept writes, or a pending connect resolved.
    pub writable: bool,

    /// The descriptor reported an error condition.
    pub error: bool,
}
