use std::io;

/// Result alias used by fallible `tidewire` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a connection stops.
///
/// A `Responder` never returns these from its notification entry points.
/// They are handed to [`ConnectionObserver::connection_broken`] once the
/// connection has been torn down.
///
/// [`ConnectionObserver::connection_broken`]: crate::ConnectionObserver::connection_broken
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel reported an I/O error while connecting, reading or writing.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),

    /// The peer closed its side of the stream.
    #[error("end of stream")]
    Eof,

    /// A packet does not fit the framing in use.
    #[error("packet of {size} bytes exceeds the {max} byte limit")]
    PacketTooLarge { size: usize, max: usize },

    /// The responder was closed on request.
    #[error("responder closed")]
    Closed,
}

impl Error {
    /// Returns `true` for teardowns the peer caused rather than a local fault.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Eof => true,
            Error::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}
