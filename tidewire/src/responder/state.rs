use super::observer::{ConnectionObserver, Notice, ResponderId};
use crate::channel::Channel;
use crate::codec::{PacketReader, PacketWriter};
use crate::error::{Error, Result};
use crate::selector::{Interest, Registration};

use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Everything a responder guards with its lock.
///
/// Producers and the event loop only ever touch these fields while
/// holding the lock, so the queue, its byte count, the interest set
/// and the open flag always change together.
pub(crate) struct State<C> {
    pub(crate) channel: C,
    pub(crate) registration: Option<Box<dyn Registration>>,
    pub(crate) writer: Box<dyn PacketWriter>,
    pub(crate) reader: Box<dyn PacketReader>,
    pub(crate) observer: Option<Arc<dyn ConnectionObserver>>,

    /// Packets not yet handed to the writer.
    pub(crate) queue: VecDeque<Bytes>,

    /// Sum of the lengths in `queue`.
    pub(crate) queued_bytes: usize,
    pub(crate) max_queue_size: usize,

    /// Bytes the channel accepted, across all packets.
    pub(crate) bytes_written: u64,

    pub(crate) read_buffer: Vec<u8>,

    pub(crate) open: bool,

    /// `connection_opened` has been queued.
    pub(crate) announced: bool,

    /// Observer work not yet delivered, in the order it happened.
    pub(crate) notices: VecDeque<Notice>,

    /// Some thread is currently running observer callbacks.
    pub(crate) delivering: bool,
}

impl<C: Channel> State<C> {
    /// Data is waiting in the writer or the queue.
    pub(crate) fn has_pending(&self) -> bool {
        !self.writer.is_empty() || !self.queue.is_empty()
    }

    /// Applies `update` to the registration's interest set.
    ///
    /// Without a registration there is nothing to update; the interest
    /// is computed from scratch once one is attached.
    pub(crate) fn update_interest(&mut self, id: ResponderId, update: impl FnOnce(Interest) -> Interest) {
        if let Some(registration) = self.registration.as_mut() {
            let current = registration.interest();
            let next = update(current);

            tracing::trace!(%id, from = ?current, to = ?next, "interest update");
            registration.set_interest(next);
        }
    }

    /// Enqueues `packet` unless it would overflow the queue bound.
    pub(crate) fn enqueue(&mut self, id: ResponderId, packet: Bytes) -> bool {
        if !self.open {
            tracing::debug!(%id, len = packet.len(), "write rejected, responder closed");
            return false;
        }

        if let Some(max) = self.writer.max_packet_size().filter(|max| packet.len() > *max) {
            tracing::debug!(%id, len = packet.len(), max, "write rejected, packet too large for framing");
            return false;
        }

        let prospective = match self.queued_bytes.checked_add(packet.len()) {
            Some(total) if total <= self.max_queue_size => total,
            _ => {
                tracing::debug!(
                    %id,
                    len = packet.len(),
                    queued = self.queued_bytes,
                    max = self.max_queue_size,
                    "write rejected, queue full"
                );
                return false;
            }
        };

        self.queued_bytes = prospective;
        self.queue.push_back(packet);

        if self.channel.is_connected() {
            self.update_interest(id, |interest| interest.with_write(true));
        }

        true
    }

    /// Moves bytes from the queue and writer into the channel.
    ///
    /// Returns once both are empty or the channel accepts nothing. Bytes
    /// the channel accepted stay counted even if a later write fails.
    pub(crate) fn drain(&mut self, id: ResponderId) -> Result<()> {
        loop {
            if self.writer.is_empty() {
                let Some(packet) = self.queue.pop_front() else {
                    return Ok(());
                };

                self.queued_bytes -= packet.len();

                // The writer may have been swapped for one with a smaller
                // limit since this packet was accepted.
                if let Err(err) = self.writer.set_packet(packet) {
                    tracing::warn!(%id, %err, "dropping packet the writer cannot frame");
                }
                continue;
            }

            let n = self.channel.write(self.writer.buffer())?;
            if n == 0 {
                tracing::trace!(%id, "send buffer full");
                return Ok(());
            }

            self.writer.advance(n);
            self.bytes_written += n as u64;

            tracing::trace!(%id, written = n, total = self.bytes_written, "wrote to channel");
        }
    }

    /// Performs one read and decodes whatever became complete.
    pub(crate) fn read_once(&mut self) -> Result<()> {
        let n = match self.channel.read(&mut self.read_buffer) {
            Ok(0) => return Err(Error::Eof),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        self.reader.feed(&self.read_buffer[..n]);

        while let Some(packet) = self.reader.next_packet()? {
            self.notices.push_back(Notice::Packet(packet));
        }

        Ok(())
    }

    /// Terminal teardown shared by explicit close and I/O failure.
    ///
    /// Cancels the registration, closes the channel and drops queued
    /// packets. Only the first call has any effect.
    pub(crate) fn teardown(&mut self, id: ResponderId, reason: Error) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Some(mut registration) = self.registration.take() {
            registration.cancel();
        }

        if let Err(err) = self.channel.close() {
            tracing::warn!(%id, %err, "failed to close channel");
        }

        let dropped = self.queue.len();
        self.queue.clear();
        self.queued_bytes = 0;

        match &reason {
            Error::Closed => tracing::info!(%id, dropped, "responder closed"),
            reason if reason.is_disconnect() => {
                tracing::info!(%id, dropped, %reason, "connection closed by peer")
            }
            reason => tracing::warn!(%id, dropped, %reason, "connection failed"),
        }

        self.notices.push_back(Notice::Broken(reason));
    }
}
