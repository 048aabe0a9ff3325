use crate::error::Error;

use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a [`Responder`](crate::Responder).
///
/// Every log event emitted on behalf of a responder carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponderId(u64);

impl ResponderId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);

        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResponderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Application callbacks for one connection.
///
/// Callbacks run without the responder's lock held, so calling back
/// into the responder (for example to write a reply) is allowed.
///
/// Callbacks for one responder never overlap and arrive in the order
/// the events happened: every `packet_received` from a read comes
/// before a `connection_broken` caused by a later `close`, even when
/// that `close` runs on another thread. The thread already delivering
/// runs the callbacks, so a `close` from a producer may return before
/// its `connection_broken` has been called.
pub trait ConnectionObserver: Send + Sync {
    /// The connect handshake completed.
    fn connection_opened(&self, id: ResponderId) {
        let _ = id;
    }

    /// A complete inbound packet was decoded.
    fn packet_received(&self, id: ResponderId, packet: Bytes) {
        let _ = (id, packet);
    }

    /// The connection was torn down. Called at most once.
    fn connection_broken(&self, id: ResponderId, reason: &Error) {
        let _ = (id, reason);
    }
}

/// Observer work queued under the lock and delivered after it.
pub(crate) enum Notice {
    Opened,
    Packet(Bytes),
    Broken(Error),
}
