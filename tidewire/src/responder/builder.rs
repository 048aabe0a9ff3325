use super::Responder;
use super::observer::{ConnectionObserver, ResponderId};
use super::state::State;
use crate::channel::Channel;
use crate::codec::{PacketReader, PacketWriter, RawPacketReader, RawPacketWriter};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Numeric settings of a [`Responder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponderConfig {
    /// Largest number of bytes allowed to wait in the write queue.
    pub max_queue_size: usize,

    /// Size of the buffer each read fills.
    pub read_buffer_size: usize,
}

impl Default for ResponderConfig {
    /// Unbounded queue and an 8 KiB read buffer.
    fn default() -> Self {
        Self {
            max_queue_size: usize::MAX,
            read_buffer_size: 8 * 1024,
        }
    }
}

/// Builder for configuring and creating a [`Responder`].
///
/// # Examples
///
/// ```rust,ignore
/// let responder = Responder::builder(channel)
///     .max_queue_size(3)
///     .packet_writer(LengthPrefixedWriter::new(2, Endianness::Big))
///     .build();
/// ```
pub struct ResponderBuilder<C> {
    channel: C,
    config: ResponderConfig,
    writer: Option<Box<dyn PacketWriter>>,
    reader: Option<Box<dyn PacketReader>>,
    observer: Option<Arc<dyn ConnectionObserver>>,
}

impl<C: Channel> ResponderBuilder<C> {
    /// Creates a builder with the default configuration.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            config: ResponderConfig::default(),
            writer: None,
            reader: None,
            observer: None,
        }
    }

    /// Replaces every numeric setting at once.
    ///
    /// # Panics
    ///
    /// Panics if `config.read_buffer_size == 0`.
    pub fn config(mut self, config: ResponderConfig) -> Self {
        assert!(config.read_buffer_size > 0, "read_buffer_size must be > 0");

        self.config = config;
        self
    }

    pub fn max_queue_size(mut self, max: usize) -> Self {
        self.config.max_queue_size = max;
        self
    }

    /// Sets the size of the buffer each read fills.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn read_buffer_size(mut self, n: usize) -> Self {
        assert!(n > 0, "read_buffer_size must be > 0");

        self.config.read_buffer_size = n;
        self
    }

    /// Sets the outgoing framing. Defaults to [`RawPacketWriter`].
    pub fn packet_writer(mut self, writer: impl PacketWriter + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Sets the inbound framing. Defaults to [`RawPacketReader`].
    pub fn packet_reader(mut self, reader: impl PacketReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the responder. No registration is attached yet.
    pub fn build(self) -> Responder<C> {
        let id = ResponderId::next();

        tracing::debug!(
            %id,
            max_queue_size = self.config.max_queue_size,
            connected = self.channel.is_connected(),
            "responder created"
        );

        let state = State {
            channel: self.channel,
            registration: None,
            writer: self
                .writer
                .unwrap_or_else(|| Box::new(RawPacketWriter::new())),
            reader: self
                .reader
                .unwrap_or_else(|| Box::new(RawPacketReader::new())),
            observer: self.observer,
            queue: VecDeque::new(),
            queued_bytes: 0,
            max_queue_size: self.config.max_queue_size,
            bytes_written: 0,
            read_buffer: vec![0; self.config.read_buffer_size],
            open: true,
            announced: false,
            notices: VecDeque::new(),
            delivering: false,
        };

        Responder {
            id,
            state: Mutex::new(state),
        }
    }
}
