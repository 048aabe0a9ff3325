use super::{Endianness, check_header_size, decode_header, max_payload};
use crate::error::{Error, Result};

use bytes::{Buf, Bytes, BytesMut};

/// Turns inbound bytes back into packets.
///
/// The responder feeds every successful read, then drains complete
/// packets with [`next_packet`](Self::next_packet) until it returns
/// `Ok(None)`. An error is fatal to the connection.
pub trait PacketReader: Send {
    /// Appends freshly read bytes.
    fn feed(&mut self, data: &[u8]);

    /// Returns the next complete packet, if one is buffered.
    fn next_packet(&mut self) -> Result<Option<Bytes>>;
}

/// Hands every read chunk on as one packet.
#[derive(Debug, Default)]
pub struct RawPacketReader {
    pending: BytesMut,
}

impl RawPacketReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketReader for RawPacketReader {
    fn feed(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    fn next_packet(&mut self) -> Result<Option<Bytes>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        Ok(Some(self.pending.split().freeze()))
    }
}

/// Reassembles packets framed by [`LengthPrefixedWriter`].
///
/// Frames may arrive split across any number of reads.
///
/// [`LengthPrefixedWriter`]: super::LengthPrefixedWriter
#[derive(Debug)]
pub struct LengthPrefixedReader {
    header_size: usize,
    endianness: Endianness,
    max_packet_size: usize,
    buffer: BytesMut,
}

impl LengthPrefixedReader {
    /// Creates a reader for `header_size`-byte length headers.
    ///
    /// The packet limit defaults to the largest length the header can
    /// express.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= header_size <= 4`.
    pub fn new(header_size: usize, endianness: Endianness) -> Self {
        check_header_size(header_size);

        Self {
            header_size,
            endianness,
            max_packet_size: max_payload(header_size),
            buffer: BytesMut::new(),
        }
    }

    /// Lowers the largest payload accepted from the peer.
    pub fn max_packet_size(mut self, max: usize) -> Self {
        self.max_packet_size = max.min(max_payload(self.header_size));
        self
    }
}

impl PacketReader for LengthPrefixedReader {
    fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_packet(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < self.header_size {
            return Ok(None);
        }

        let len = decode_header(&self.buffer[..self.header_size], self.endianness);
        if len > self.max_packet_size {
            return Err(Error::PacketTooLarge {
                size: len,
                max: self.max_packet_size,
            });
        }

        // The buffer grows with the bytes that actually arrive, never with
        // the length the peer announced.
        if self.buffer.len() < self.header_size + len {
            return Ok(None);
        }

        self.buffer.advance(self.header_size);
        Ok(Some(self.buffer.split_to(len).freeze()))
    }
}
