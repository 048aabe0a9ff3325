//! Non-blocking byte-stream channels.
//!
//! [`Channel`] is the capability set a [`Responder`](crate::Responder)
//! drives. Every operation makes a single, non-blocking attempt and
//! reports how far it got instead of suspending.
//!
//! [`TcpChannel`] is the concrete implementation over a raw TCP socket.

#[cfg(target_os = "linux")]
mod sys;
#[cfg(target_os = "linux")]
mod tcp;

#[cfg(target_os = "linux")]
pub use tcp::TcpChannel;

use std::io;

/// A non-blocking, bidirectional byte-stream endpoint.
pub trait Channel: Send {
    /// Returns `true` once the connect handshake has completed.
    fn is_connected(&self) -> bool;

    /// Attempts to complete a pending connect.
    ///
    /// Returns `Ok(true)` when the channel is connected and `Ok(false)`
    /// when the handshake is still in progress.
    fn finish_connect(&mut self) -> io::Result<bool>;

    /// Reads whatever is available into `buffer`.
    ///
    /// `Ok(0)` means the peer closed the stream. An error of kind
    /// `WouldBlock` means nothing is available yet.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Writes as much of `buffer` as the channel accepts right now.
    ///
    /// `Ok(0)` means the send buffer is full.
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize>;

    /// Closes the channel. Closing twice is not an error.
    fn close(&mut self) -> io::Result<()>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn finish_connect(&mut self) -> io::Result<bool> {
        (**self).finish_connect()
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        (**self).read(buffer)
    }

    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        (**self).write(buffer)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
