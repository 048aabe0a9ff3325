//! # Tidewire
//!
//! **Tidewire** is the connection-level core of a selector-driven socket
//! framework. It adapts one raw, non-blocking channel to an event loop
//! and gives the application a packet-oriented write API on top of it.
//!
//! The central type is the [`Responder`]. It offers:
//!
//! - A **bounded write queue**: writes past the limit are refused, so
//!   slow peers push back on producers instead of growing memory
//! - **Partial-write continuation**: whatever the socket does not take
//!   stays buffered and is resumed on the next writable notification
//! - **Accurate interest sets**: WRITE interest is held exactly while
//!   data is waiting, CONNECT until the handshake resolves
//! - **Failure-triggered teardown**: any I/O error cancels the
//!   registration and closes the channel, exactly once
//!
//! Wire formats are pluggable through [`PacketWriter`] and
//! [`PacketReader`]. The crate ships raw and length-prefixed framings,
//! a non-blocking [`TcpChannel`] and an `epoll` [`Selector`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::os::fd::AsRawFd;
//! use tidewire::{Interest, Responder, Selector, TcpChannel};
//!
//! let channel = TcpChannel::connect("127.0.0.1:9000".parse()?)?;
//! let mut selector = Selector::new()?;
//! let key = selector.register(channel.as_raw_fd(), 0, Interest::CONNECT)?;
//!
//! let responder = Responder::builder(channel).max_queue_size(1 << 20).build();
//! responder.set_registration(key);
//! responder.write(&b"hello"[..]);
//!
//! let mut ready = Vec::new();
//! while responder.is_open() {
//!     selector.select(&mut ready, None)?;
//!     for readiness in &ready {
//!         responder.dispatch(*readiness);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`channel`]: the channel capability and its TCP implementation
//! - [`codec`]: packet framing
//! - [`selector`]: interest sets, registrations and the `epoll` selector

mod error;
mod responder;

pub mod channel;
pub mod codec;
pub mod selector;

pub use channel::Channel;
#[cfg(target_os = "linux")]
pub use channel::TcpChannel;
pub use codec::{PacketReader, PacketWriter};
pub use error::{Error, Result};
pub use responder::{
    ConnectionObserver, Responder, ResponderBuilder, ResponderConfig, ResponderId,
};
pub use selector::{Interest, Readiness, Registration};
#[cfg(target_os = "linux")]
pub use selector::{SelectionKey, Selector};
