use super::Channel;
use super::sys::{
    domain_of, sys_close, sys_connect, sys_ipv6_is_necessary, sys_peername, sys_read, sys_send,
    sys_sockname, sys_socket, sys_take_socket_error,
};

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};

/// A non-blocking TCP socket.
///
/// `TcpChannel` performs no buffering of its own: reads and writes go
/// straight to the socket and report partial progress. It is meant to
/// be owned by a [`Responder`](crate::Responder) and registered with a
/// [`Selector`](crate::Selector) through its raw descriptor.
///
/// The descriptor is closed by [`Channel::close`] or on drop.
#[derive(Debug)]
pub struct TcpChannel {
    fd: RawFd,
    connected: bool,
    closed: bool,
}

impl TcpChannel {
    /// Starts a non-blocking connection to `addr`.
    ///
    /// The returned channel is usually still connecting; register it
    /// with connect interest and call [`Channel::finish_connect`] once
    /// the selector reports it writable.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let domain = domain_of(&addr);
        let fd = sys_socket(domain)?;

        let started = sys_ipv6_is_necessary(fd, domain).and_then(|_| sys_connect(fd, &addr));

        match started {
            Ok(connected) => {
                tracing::debug!(fd, %addr, connected, "connect started");

                Ok(Self {
                    fd,
                    connected,
                    closed: false,
                })
            }
            Err(err) => {
                let _ = sys_close(fd);
                Err(err)
            }
        }
    }

    /// Wraps an already connected standard library stream.
    ///
    /// The stream is switched to non-blocking mode.
    pub fn from_std(stream: std::net::TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;

        Ok(Self {
            fd: stream.into_raw_fd(),
            connected: true,
            closed: false,
        })
    }

    /// Returns the remote address of this connection.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.ensure_open()?;
        sys_peername(self.fd)
    }

    /// Returns the local address of this connection.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.ensure_open()?;
        sys_sockname(self.fd)
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "channel is closed",
            ))
        } else {
            Ok(())
        }
    }
}

impl AsRawFd for TcpChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Channel for TcpChannel {
    fn is_connected(&self) -> bool {
        self.connected && !self.closed
    }

    fn finish_connect(&mut self) -> io::Result<bool> {
        self.ensure_open()?;

        if self.connected {
            return Ok(true);
        }

        if let Some(err) = sys_take_socket_error(self.fd)? {
            return Err(err);
        }

        match sys_peername(self.fd) {
            Ok(_) => {
                self.connected = true;
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;

        loop {
            match sys_read(self.fd, buffer) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;

        loop {
            match sys_send(self.fd, buffer) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(err),
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.connected = false;
        sys_close(self.fd)
    }
}

impl Drop for TcpChannel {
    /// Closes the socket if it is still open.
    fn drop(&mut self) {
        if !self.closed {
            let _ = sys_close(self.fd);
        }
    }
}
