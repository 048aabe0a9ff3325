/// The readiness conditions a registration wants to be told about.
///
/// Each flag is independent. The selector translates the set into its
/// native event mask whenever a registration is created or updated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Interest {
    /// Waiting for a non-blocking connect to complete.
    pub connect: bool,

    /// Waiting for inbound data.
    pub read: bool,

    /// Waiting for room in the send buffer.
    pub write: bool,
}

impl Interest {
    /// No readiness wanted.
    pub const NONE: Interest = Interest {
        connect: false,
        read: false,
        write: false,
    };

    pub const CONNECT: Interest = Interest {
        connect: true,
        read: false,
        write: false,
    };

    pub const READ: Interest = Interest {
        connect: false,
        read: true,
        write: false,
    };

    pub const WRITE: Interest = Interest {
        connect: false,
        read: false,
        write: true,
    };

    /// Returns a copy with the connect flag set to `on`.
    pub fn with_connect(self, on: bool) -> Self {
        Self {
            connect: on,
            ..self
        }
    }

    /// Returns a copy with the read flag set to `on`.
    pub fn with_read(self, on: bool) -> Self {
        Self { read: on, ..self }
    }

    /// Returns a copy with the write flag set to `on`.
    pub fn with_write(self, on: bool) -> Self {
        Self { write: on, ..self }
    }

    pub fn is_empty(self) -> bool {
        !(self.connect || self.read || self.write)
    }
}

impl std::ops::BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest {
            connect: self.connect || rhs.connect,
            read: self.read || rhs.read,
            write: self.write || rhs.write,
        }
    }
}
