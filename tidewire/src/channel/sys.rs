use libc::{
    AF_INET, AF_INET6, IPPROTO_IPV6, IPV6_V6ONLY, SO_ERROR, SOCK_CLOEXEC, SOCK_NONBLOCK,
    SOCK_STREAM, SOL_SOCKET, c_int, close, connect, getpeername, getsockname, getsockopt, in_addr,
    in6_addr, read, sa_family_t, send, setsockopt, sockaddr, sockaddr_in, sockaddr_in6,
    sockaddr_storage, socket, socklen_t,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem, ptr};

/// Reads from a non-blocking descriptor into `buffer`.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Writes `buffer` to a non-blocking socket.
///
/// `MSG_NOSIGNAL` turns a write to a dead peer into `EPIPE` instead of
/// raising `SIGPIPE`.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    let n = unsafe {
        send(
            fd,
            buffer.as_ptr() as *const _,
            buffer.len(),
            libc::MSG_NOSIGNAL,
        )
    };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) -> io::Result<()> {
    let rc = unsafe { close(fd) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Creates a stream socket that is non-blocking and close-on-exec from
/// the start.
pub(crate) fn sys_socket(domain: c_int) -> io::Result<RawFd> {
    let fd = unsafe { socket(domain, SOCK_STREAM | SOCK_NONBLOCK | SOCK_CLOEXEC, 0) };
    if fd < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

/// Starts a non-blocking connect.
///
/// Returns `Ok(true)` when the connection completed immediately and
/// `Ok(false)` when it is still in progress.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<bool> {
    let raw = RawAddr::from(addr);

    let rc = unsafe { connect(fd, raw.as_ptr(), raw.len) };
    if rc == 0 {
        return Ok(true);
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EINPROGRESS) {
        Ok(false)
    } else {
        Err(err)
    }
}

/// Reads and clears the pending socket error (`SO_ERROR`).
pub(crate) fn sys_take_socket_error(fd: RawFd) -> io::Result<Option<io::Error>> {
    let mut err: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    let rc = unsafe {
        getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut err as *mut _ as *mut _,
            &mut len,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else if err != 0 {
        Ok(Some(io::Error::from_raw_os_error(err)))
    } else {
        Ok(None)
    }
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    query_addr(|addr, len| unsafe { getsockname(fd, addr, len) })
}

/// Returns the remote address of a connected socket.
///
/// Fails with `ENOTCONN` while a connect is still pending.
pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    query_addr(|addr, len| unsafe { getpeername(fd, addr, len) })
}

/// Runs a `getsockname`-shaped call and decodes the address it fills in.
fn query_addr(call: impl FnOnce(*mut sockaddr, *mut socklen_t) -> c_int) -> io::Result<SocketAddr> {
    let mut raw = RawAddr::empty();

    if call(raw.as_mut_ptr(), &mut raw.len) < 0 {
        return Err(io::Error::last_os_error());
    }

    raw.to_socket_addr()
}

/// Returns the socket domain matching an address.
pub(crate) fn domain_of(addr: &SocketAddr) -> c_int {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}

/// A socket address in the kernel's layout.
struct RawAddr {
    storage: sockaddr_storage,
    len: socklen_t,
}

impl RawAddr {
    /// Zeroed storage sized for any address family, ready to be filled.
    fn empty() -> Self {
        Self {
            storage: unsafe { mem::zeroed() },
            len: mem::size_of::<sockaddr_storage>() as socklen_t,
        }
    }

    fn as_ptr(&self) -> *const sockaddr {
        &self.storage as *const sockaddr_storage as *const sockaddr
    }

    fn as_mut_ptr(&mut self) -> *mut sockaddr {
        &mut self.storage as *mut sockaddr_storage as *mut sockaddr
    }

    fn to_socket_addr(&self) -> io::Result<SocketAddr> {
        match self.storage.ss_family as c_int {
            AF_INET => {
                // SAFETY: the kernel wrote a `sockaddr_in` for this family.
                let sin = unsafe { &*(self.as_ptr() as *const sockaddr_in) };

                Ok(SocketAddr::from((
                    Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                    u16::from_be(sin.sin_port),
                )))
            }
            AF_INET6 => {
                // SAFETY: the kernel wrote a `sockaddr_in6` for this family.
                let sin6 = unsafe { &*(self.as_ptr() as *const sockaddr_in6) };

                Ok(SocketAddr::V6(SocketAddrV6::new(
                    Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                    u16::from_be(sin6.sin6_port),
                    sin6.sin6_flowinfo,
                    sin6.sin6_scope_id,
                )))
            }
            family => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported address family {family}"),
            )),
        }
    }
}

impl From<&SocketAddr> for RawAddr {
    fn from(addr: &SocketAddr) -> Self {
        let mut raw = Self::empty();

        raw.len = match addr {
            SocketAddr::V4(v4) => {
                let sin = sockaddr_in {
                    sin_family: AF_INET as sa_family_t,
                    sin_port: v4.port().to_be(),
                    sin_addr: in_addr {
                        s_addr: u32::from(*v4.ip()).to_be(),
                    },
                    sin_zero: [0; 8],
                };
                // SAFETY: `sockaddr_storage` is large and aligned enough for any family.
                unsafe { ptr::write(raw.as_mut_ptr() as *mut sockaddr_in, sin) };

                mem::size_of::<sockaddr_in>() as socklen_t
            }
            SocketAddr::V6(v6) => {
                let sin6 = sockaddr_in6 {
                    sin6_family: AF_INET6 as sa_family_t,
                    sin6_port: v6.port().to_be(),
                    sin6_flowinfo: v6.flowinfo(),
                    sin6_addr: in6_addr {
                        s6_addr: v6.ip().octets(),
                    },
                    sin6_scope_id: v6.scope_id(),
                };
                // SAFETY: as above.
                unsafe { ptr::write(raw.as_mut_ptr() as *mut sockaddr_in6, sin6) };

                mem::size_of::<sockaddr_in6>() as socklen_t
            }
        };

        raw
    }
}

/// Clears `IPV6_V6ONLY` on IPv6 sockets so they accept mapped IPv4 peers.
pub(crate) fn sys_ipv6_is_necessary(fd: RawFd, domain: c_int) -> io::Result<()> {
    if domain != AF_INET6 {
        return Ok(());
    }

    let value: c_int = 0;

    let rc = unsafe {
        setsockopt(
            fd,
            IPPROTO_IPV6,
            IPV6_V6ONLY,
            &value as *const _ as *const _,
            mem::size_of::<c_int>() as socklen_t,
        )
    };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
