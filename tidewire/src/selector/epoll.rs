//! Linux `epoll`-based selector.
//!
//! Responsibilities:
//! - Register file descriptors with connect/read/write interests
//! - Update or drop those interests through [`SelectionKey`]
//! - Block waiting for readiness, with an optional timeout
//!
//! Interest updates issued from producer threads take effect on a
//! concurrently blocked `epoll_wait`, so no wake-up descriptor is needed.

use super::Registration;
use super::event::Readiness;
use super::interest::Interest;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, EPOLLRDHUP, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Owned epoll descriptor, closed when the last holder goes away.
///
/// Keys keep a handle so they can update their interest after the
/// selector itself has moved to the event-loop thread.
#[derive(Debug)]
struct EpollFd(RawFd);

impl Drop for EpollFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

/// Translates an interest set into an epoll event mask.
///
/// A pending connect completes when the socket turns writable, so
/// `connect` and `write` both map to `EPOLLOUT`.
fn epoll_flags(interest: Interest) -> u32 {
    let mut flags = 0;

    if interest.read {
        flags |= EPOLLIN | EPOLLRDHUP;
    }
    if interest.write || interest.connect {
        flags |= EPOLLOUT;
    }

    flags as u32
}

/// Linux `epoll` selector.
///
/// The selector owns:
/// - an `epoll` instance shared with every key it hands out,
/// - a reusable event buffer.
pub struct Selector {
    /// Epoll file descriptor.
    epoll: Arc<EpollFd>,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl Selector {
    /// Creates a new selector able to report up to 64 events per call.
    pub fn new() -> io::Result<Self> {
        Self::with_capacity(64)
    }

    /// Creates a new selector reporting at most `capacity` events per call.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_capacity(capacity: usize) -> io::Result<Self> {
        assert!(capacity > 0, "selector capacity must be > 0");

        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll: Arc::new(EpollFd(epoll)),
            events: Vec::with_capacity(capacity),
        })
    }

    /// Registers `fd` and returns the key that controls its interest set.
    ///
    /// `token` is echoed back in every [`Readiness`] for this descriptor.
    pub fn register(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<SelectionKey> {
        let mut event = epoll_event {
            events: epoll_flags(interest),
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll.0, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        tracing::debug!(fd, token, ?interest, "registered descriptor");

        Ok(SelectionKey {
            epoll: self.epoll.clone(),
            fd,
            token,
            interest,
            cancelled: false,
        })
    }

    /// Waits for readiness events and stores them in `ready`.
    ///
    /// Blocks until:
    /// - at least one registered descriptor becomes ready,
    /// - or the optional timeout expires.
    ///
    /// `ready` is cleared first. Returns the number of events stored.
    /// An interrupted wait returns `Ok(0)`.
    pub fn select(
        &mut self,
        ready: &mut Vec<Readiness>,
        timeout: Option<Duration>,
    ) -> io::Result<usize> {
        let timeout_ms = timeout
            .map(|t| t.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1);

        ready.clear();
        self.events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll.0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }

        // The kernel initialized the first `n` entries.
        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let flags = ev.events;
            let token = ev.u64 as usize;

            let hangup = flags & ((EPOLLHUP | EPOLLRDHUP) as u32) != 0;

            ready.push(Readiness {
                token,
                readable: flags & (EPOLLIN as u32) != 0 || hangup,
                writable: flags & (EPOLLOUT as u32) != 0,
                error: flags & (EPOLLERR as u32) != 0,
            });
        }

        Ok(ready.len())
    }
}

/// Handle tying one descriptor to a [`Selector`].
///
/// The key remembers the interest set it last installed and is the
/// only way to change it. Once canceled it ignores further updates.
#[derive(Debug)]
pub struct SelectionKey {
    epoll: Arc<EpollFd>,
    fd: RawFd,
    token: usize,
    interest: Interest,
    cancelled: bool,
}

impl SelectionKey {
    /// Token passed to [`Selector::register`].
    pub fn token(&self) -> usize {
        self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Registration for SelectionKey {
    fn interest(&self) -> Interest {
        self.interest
    }

    fn set_interest(&mut self, interest: Interest) {
        if self.cancelled || interest == self.interest {
            return;
        }

        let mut event = epoll_event {
            events: epoll_flags(interest),
            u64: self.token as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll.0, EPOLL_CTL_MOD, self.fd, &mut event) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            tracing::warn!(fd = self.fd, token = self.token, %err, "failed to update interest");
            return;
        }

        self.interest = interest;
    }

    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        unsafe {
            epoll_ctl(self.epoll.0, EPOLL_CTL_DEL, self.fd, std::ptr::null_mut());
        }

        tracing::debug!(fd = self.fd, token = self.token, "registration canceled");
    }
}
