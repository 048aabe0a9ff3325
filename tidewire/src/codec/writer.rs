use super::{Endianness, check_header_size, encode_header, max_payload};
use crate::error::{Error, Result};

use bytes::buf::Chain;
use bytes::{Buf, Bytes};

/// Turns outgoing packets into bytes for the channel.
///
/// A writer holds at most one packet in flight. The responder asks for
/// the next slice with [`buffer`](Self::buffer), writes it, and reports
/// how much the channel accepted with [`advance`](Self::advance). A new
/// packet is only handed over once [`is_empty`](Self::is_empty) is true.
pub trait PacketWriter: Send {
    /// Returns `true` when nothing of the current packet remains.
    fn is_empty(&self) -> bool;

    /// Starts writing `packet`.
    ///
    /// Only called while the writer is empty.
    fn set_packet(&mut self, packet: Bytes) -> Result<()>;

    /// The bytes to write next. Empty when the writer is empty.
    fn buffer(&self) -> &[u8];

    /// Marks `n` bytes of [`buffer`](Self::buffer) as written.
    fn advance(&mut self, n: usize);

    /// Largest packet [`set_packet`](Self::set_packet) will accept.
    fn max_packet_size(&self) -> Option<usize> {
        None
    }
}

/// Writes packets verbatim, with no framing.
#[derive(Debug, Default)]
pub struct RawPacketWriter {
    current: Bytes,
}

impl RawPacketWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketWriter for RawPacketWriter {
    fn is_empty(&self) -> bool {
        !self.current.has_remaining()
    }

    fn set_packet(&mut self, packet: Bytes) -> Result<()> {
        self.current = packet;
        Ok(())
    }

    fn buffer(&self) -> &[u8] {
        &self.current
    }

    fn advance(&mut self, n: usize) {
        self.current.advance(n);
    }
}

/// Writes every packet behind an unsigned length header.
///
/// The header and payload are chained without copying; [`buffer`]
/// yields the header first and the payload once the header is out.
///
/// [`buffer`]: PacketWriter::buffer
#[derive(Debug)]
pub struct LengthPrefixedWriter {
    header_size: usize,
    endianness: Endianness,
    frame: Chain<Bytes, Bytes>,
}

impl LengthPrefixedWriter {
    /// Creates a writer using a `header_size`-byte length header.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= header_size <= 4`.
    pub fn new(header_size: usize, endianness: Endianness) -> Self {
        check_header_size(header_size);

        Self {
            header_size,
            endianness,
            frame: Bytes::new().chain(Bytes::new()),
        }
    }
}

impl PacketWriter for LengthPrefixedWriter {
    fn is_empty(&self) -> bool {
        !self.frame.has_remaining()
    }

    fn set_packet(&mut self, packet: Bytes) -> Result<()> {
        let max = max_payload(self.header_size);
        if packet.len() > max {
            return Err(Error::PacketTooLarge {
                size: packet.len(),
                max,
            });
        }

        let header = Bytes::from(encode_header(
            packet.len(),
            self.header_size,
            self.endianness,
        ));
        self.frame = header.chain(packet);

        Ok(())
    }

    fn buffer(&self) -> &[u8] {
        self.frame.chunk()
    }

    fn advance(&mut self, n: usize) {
        self.frame.advance(n);
    }

    fn max_packet_size(&self) -> Option<usize> {
        Some(max_payload(self.header_size))
    }
}
