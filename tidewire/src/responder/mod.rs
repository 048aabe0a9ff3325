//! The connection-level core.
//!
//! A [`Responder`] adapts one non-blocking [`Channel`] to an event
//! loop. Application threads hand it packets through
//! [`write`](Responder::write); the event loop tells it when the channel
//! is connectable, readable or writable. The responder keeps the
//! selector interest set in step with what it still has to do:
//! - CONNECT until the handshake resolves,
//! - READ for as long as the connection is open,
//! - WRITE exactly while unflushed data remains.
//!
//! Outgoing packets wait in a bounded queue. A write that would push
//! the queued byte count past the configured maximum is refused, which
//! is how producers feel backpressure from a slow peer.
//!
//! Any I/O failure is terminal: the registration is canceled, the
//! channel closed, and the observer told once.

mod builder;
mod observer;
mod state;

pub use builder::{ResponderBuilder, ResponderConfig};
pub use observer::{ConnectionObserver, ResponderId};

use crate::channel::Channel;
use crate::codec::{PacketReader, PacketWriter};
use crate::error::Error;
use crate::selector::{Interest, Readiness, Registration};

use observer::Notice;
use state::State;

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// Packet-oriented front end for one non-blocking channel.
///
/// `Responder` is `Send + Sync`: producers may call
/// [`write`](Self::write) from any thread while a single event-loop
/// thread calls the `notify_*` methods.
///
/// # Examples
///
/// ```rust,ignore
/// let channel = TcpChannel::connect(addr)?;
/// let mut selector = Selector::new()?;
/// let key = selector.register(channel.as_raw_fd(), 0, Interest::CONNECT)?;
///
/// let responder = Responder::builder(channel).max_queue_size(64 * 1024).build();
/// responder.set_registration(key);
/// responder.write(&b"hello"[..]);
///
/// let mut ready = Vec::new();
/// while responder.is_open() {
///     selector.select(&mut ready, None)?;
///     for readiness in &ready {
///         responder.dispatch(*readiness);
///     }
/// }
/// ```
pub struct Responder<C: Channel> {
    id: ResponderId,
    state: Mutex<State<C>>,
}

impl<C: Channel> Responder<C> {
    /// Creates a responder with the default configuration: an unbounded
    /// queue and no framing.
    pub fn new(channel: C) -> Self {
        Self::builder(channel).build()
    }

    /// Starts configuring a responder for `channel`.
    pub fn builder(channel: C) -> ResponderBuilder<C> {
        ResponderBuilder::new(channel)
    }

    pub fn id(&self) -> ResponderId {
        self.id
    }

    /// Queues `packet` for sending.
    ///
    /// Returns `false`, leaving the queue untouched, when the packet
    /// would push the queued byte count past the maximum, when the
    /// packet cannot be framed by the current writer, or when the
    /// responder is closed.
    ///
    /// Before the channel is connected the packet is only queued;
    /// draining starts once the connect completes.
    pub fn write(&self, packet: impl Into<Bytes>) -> bool {
        self.state.lock().enqueue(self.id, packet.into())
    }

    /// Bounds the number of queued bytes. Already queued packets stay.
    pub fn set_max_queue_size(&self, max: usize) {
        self.state.lock().max_queue_size = max;
    }

    /// Replaces the outgoing packet framing.
    ///
    /// Whatever remains of a partially written packet is discarded with
    /// the old writer.
    pub fn set_packet_writer(&self, writer: impl PacketWriter + 'static) {
        let mut state = self.state.lock();

        if !state.writer.is_empty() {
            tracing::debug!(id = %self.id, "discarding partially written packet");
        }
        state.writer = Box::new(writer);
    }

    /// Replaces the inbound packet framing. Buffered bytes are discarded.
    pub fn set_packet_reader(&self, reader: impl PacketReader + 'static) {
        self.state.lock().reader = Box::new(reader);
    }

    pub fn set_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        self.state.lock().observer = Some(observer);
    }

    /// Attaches the selector registration for this responder's channel.
    ///
    /// The initial interest is CONNECT for a channel still connecting,
    /// otherwise READ, plus WRITE when data is already queued. A
    /// registration it replaces is canceled, and so is one attached
    /// after close.
    pub fn set_registration(&self, registration: impl Registration + 'static) {
        let mut registration: Box<dyn Registration> = Box::new(registration);

        {
            let mut state = self.state.lock();

            if !state.open {
                registration.cancel();
                return;
            }

            let interest = if state.channel.is_connected() {
                Interest::READ.with_write(state.has_pending())
            } else {
                Interest::CONNECT
            };

            tracing::debug!(id = %self.id, ?interest, "registration attached");
            registration.set_interest(interest);

            if let Some(mut previous) = state.registration.replace(registration) {
                previous.cancel();
            }

            if state.channel.is_connected() && !state.announced {
                state.announced = true;
                state.notices.push_back(Notice::Opened);
            }
        }

        self.deliver();
    }

    /// Handles connect readiness by finishing the handshake.
    ///
    /// On success READ interest is set, plus WRITE when packets were
    /// queued while connecting. A failed handshake tears the responder
    /// down. Once the channel is connected further calls do nothing.
    pub fn notify_can_connect(&self) {
        {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }

            if state.channel.is_connected() {
                tracing::debug!(id = %self.id, "connect readiness on a connected channel");
                return;
            }

            match state.channel.finish_connect() {
                Ok(true) => {
                    let pending = state.has_pending();

                    state.update_interest(self.id, |interest| {
                        let interest = interest.with_connect(false).with_read(true);
                        if pending {
                            interest.with_write(true)
                        } else {
                            interest
                        }
                    });

                    tracing::info!(id = %self.id, pending, "connection opened");

                    if !state.announced {
                        state.announced = true;
                        state.notices.push_back(Notice::Opened);
                    }
                }
                Ok(false) => {
                    tracing::debug!(id = %self.id, "connect still in progress");
                }
                Err(err) => {
                    state.teardown(self.id, err.into());
                }
            }
        }

        self.deliver();
    }

    /// Handles read readiness with a single non-blocking read.
    ///
    /// Complete packets are handed to the observer. End of stream and
    /// read errors tear the responder down.
    pub fn notify_can_read(&self) {
        {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }

            if let Err(err) = state.read_once() {
                state.teardown(self.id, err);
            }
        }

        self.deliver();
    }

    /// Handles write readiness by draining as much as the channel takes.
    ///
    /// WRITE interest is cleared before draining and set again only if
    /// data is left over, so a `write` racing with the drain can never
    /// lose its wake-up.
    pub fn notify_can_write(&self) {
        {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }

            state.update_interest(self.id, |interest| interest.with_write(false));

            match state.drain(self.id) {
                Ok(()) => {
                    if state.has_pending() {
                        state.update_interest(self.id, |interest| interest.with_write(true));
                    }
                }
                Err(err) => {
                    state.teardown(self.id, err);
                }
            }
        }

        self.deliver();
    }

    /// Routes one selector event to the matching notification.
    ///
    /// Writability while awaiting a connect means the connect resolved.
    /// Errors and hang-ups are treated as readable so the read surfaces
    /// them.
    pub fn dispatch(&self, readiness: Readiness) {
        let interest = self.interest().unwrap_or_default();

        if interest.connect {
            if readiness.writable || readiness.error {
                self.notify_can_connect();
            }
            return;
        }

        if readiness.readable || readiness.error {
            self.notify_can_read();
        }

        if readiness.writable && interest.write {
            self.notify_can_write();
        }
    }

    /// Interest set currently installed, if a registration is attached.
    pub fn interest(&self) -> Option<Interest> {
        self.state
            .lock()
            .registration
            .as_ref()
            .map(|registration| registration.interest())
    }

    /// Total bytes the channel has accepted.
    pub fn bytes_written(&self) -> u64 {
        self.state.lock().bytes_written
    }

    /// Bytes waiting in the queue, not counting the packet in flight.
    pub fn write_queue_size(&self) -> usize {
        self.state.lock().queued_bytes
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Closes the responder. Later calls do nothing.
    pub fn close(&self) {
        self.state.lock().teardown(self.id, Error::Closed);
        self.deliver();
    }

    /// Runs queued observer callbacks without holding the lock.
    ///
    /// Only one thread delivers at a time. A thread that finds delivery
    /// in progress leaves its notices to that thread, so callbacks run
    /// in the order the notices were queued.
    fn deliver(&self) {
        {
            let mut state = self.state.lock();
            if state.delivering || state.notices.is_empty() {
                return;
            }
            state.delivering = true;
        }

        let _delivering = DeliveryGuard(&self.state);

        loop {
            let (observer, notice) = {
                let mut state = self.state.lock();
                match state.notices.pop_front() {
                    Some(notice) => (state.observer.clone(), notice),
                    None => {
                        state.delivering = false;
                        return;
                    }
                }
            };

            let Some(observer) = observer else {
                continue;
            };

            match notice {
                Notice::Opened => observer.connection_opened(self.id),
                Notice::Packet(packet) => observer.packet_received(self.id, packet),
                Notice::Broken(reason) => observer.connection_broken(self.id, &reason),
            }
        }
    }
}

/// Releases delivery if an observer callback panics.
struct DeliveryGuard<'a, C>(&'a Mutex<State<C>>);

impl<C> Drop for DeliveryGuard<'_, C> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().delivering = false;
        }
    }
}
