// MIT License - Copyright (c) 2026 Peter Wright
// Controller line transport

pub mod tcp;

use std::future::Future;

use crate::error::Result;

pub use tcp::TcpLineSource;

/// A connection that yields newline-terminated lines.
///
/// Implementations do not retry; the connection worker owns retry policy.
pub trait LineSource: Send {
    /// Connect to the controller, replacing any existing connection.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Next line with trailing whitespace removed, or `None` once the peer
    /// has closed the stream.
    fn read_line(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Release the connection. Safe to call repeatedly.
    fn close(&mut self);

    /// `host:port` for log messages.
    fn peer(&self) -> String;
}
