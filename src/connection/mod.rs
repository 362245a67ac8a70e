// Long-poll connection lifecycle (state machine, transport, driver)

mod client;
mod manager;
mod transport;

pub use client::{ClientHandle, LiveClient};
pub use manager::ConnectionManager;
pub use transport::{ChunkStream, HttpTransport, Transport};

use std::fmt;

#[cfg(test)]
mod tests;

/// Whether snapshots are currently arriving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Transport-level failure of the status request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Connection refused, reset, or otherwise broken
    Transport(String),
    /// Server answered with a non-success HTTP status
    Status(u16),
    /// Request ended without delivering a single byte
    EmptyResponse,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Transport(e) => write!(f, "transport error: {}", e),
            RequestError::Status(code) => write!(f, "server returned HTTP {}", code),
            RequestError::EmptyResponse => write!(f, "request ended without data"),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => RequestError::Status(status.as_u16()),
            None => RequestError::Transport(e.to_string()),
        }
    }
}
