//! Connection to the notification server.
//!
//! The panel never reaches for a global socket. Whoever wires it up
//! constructs a [`RemoteChannel`] and hands it over; connect and disconnect
//! are explicit calls.
//!
//! Reconnection and backoff belong to the channel implementation. The panel
//! only sees decoded [`ChannelEvent`]s.

mod memory;
mod types;

pub use memory::{MemoryChannel, MemoryHub, DEFAULT_QUEUE_CAPACITY};
pub use types::{ChannelEvent, OutboundEvent};

use crate::error::Result;

/// A live, bidirectional event transport.
pub trait RemoteChannel {
    /// Open the connection. Connecting twice is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Next inbound event, if one is ready. Never blocks.
    fn poll(&mut self) -> Result<Option<ChannelEvent>>;

    /// Send an event to the server.
    fn emit(&mut self, event: OutboundEvent) -> Result<()>;

    /// Close the connection. Disconnecting twice is a no-op.
    fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

impl<C: RemoteChannel + ?Sized> RemoteChannel for Box<C> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn poll(&mut self) -> Result<Option<ChannelEvent>> {
        (**self).poll()
    }

    fn emit(&mut self, event: OutboundEvent) -> Result<()> {
        (**self).emit(event)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
