//! Readiness selection.
//!
//! This module holds the pieces a dispatcher needs to drive a
//! [`Responder`](crate::Responder):
//! - [`Interest`]: the connect/read/write flags a registration carries,
//! - [`Registration`]: the capability a responder uses to change them,
//! - [`Selector`] and [`SelectionKey`]: the Linux `epoll` implementation,
//! - [`Readiness`]: one event reported by the selector.

mod event;
mod interest;

#[cfg(target_os = "linux")]
mod epoll;

pub use event::Readiness;
pub use interest::Interest;

#[cfg(target_os = "linux")]
pub use epoll::{SelectionKey, Selector};

/// A selector-held record of interest for one channel.
///
/// The responder owning the channel is the only component that mutates
/// the interest set. Canceling is permanent; implementations must treat
/// repeated cancellation as a no-op.
pub trait Registration: Send {
    /// Returns the interest set currently installed.
    fn interest(&self) -> Interest;

    /// Replaces the interest set.
    fn set_interest(&mut self, interest: Interest);

    /// Detaches the channel from its selector.
    fn cancel(&mut self);
}

impl<R: Registration + ?Sized> Registration for Box<R> {
    fn interest(&self) -> Interest {
        (**self).interest()
    }

    fn set_interest(&mut self, interest: Interest) {
        (**self).set_interest(interest)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}
