//! Packet framing.
//!
//! A responder moves opaque packets. How a packet becomes bytes on the
//! wire, and how inbound bytes become packets again, is delegated to a
//! [`PacketWriter`] and a [`PacketReader`]:
//! - [`RawPacketWriter`] / [`RawPacketReader`]: no framing at all,
//! - [`LengthPrefixedWriter`] / [`LengthPrefixedReader`]: an unsigned
//!   length header of one to four bytes ahead of every payload.

mod reader;
mod writer;

pub use reader::{LengthPrefixedReader, PacketReader, RawPacketReader};
pub use writer::{LengthPrefixedWriter, PacketWriter, RawPacketWriter};

/// Byte order of a length header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Largest payload a header of `header_size` bytes can describe.
fn max_payload(header_size: usize) -> usize {
    if header_size >= 4 {
        u32::MAX as usize
    } else {
        (1usize << (8 * header_size)) - 1
    }
}

fn check_header_size(header_size: usize) {
    assert!(
        (1..=4).contains(&header_size),
        "header_size must be between 1 and 4"
    );
}

fn encode_header(len: usize, header_size: usize, endianness: Endianness) -> Vec<u8> {
    let len = len as u32;

    match endianness {
        Endianness::Big => len.to_be_bytes()[4 - header_size..].to_vec(),
        Endianness::Little => len.to_le_bytes()[..header_size].to_vec(),
    }
}

fn decode_header(header: &[u8], endianness: Endianness) -> usize {
    let fold = |acc: usize, byte: &u8| (acc << 8) | *byte as usize;

    match endianness {
        Endianness::Big => header.iter().fold(0, fold),
        Endianness::Little => header.iter().rev().fold(0, fold),
    }
}
