// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Network transports for talking to upstream resolvers.
//!
//! The [transaction manager](crate::transaction) decides *what* to send
//! and where; this module does the sending. Queries go out over UDP
//! through a [`UdpTransport`] shared by every transaction, or over TCP
//! with one connection per [`tcp::exchange`]. Everything runs on Tokio.
//!
//! Connectivity failures are reported as a [`TransportError`], which is
//! deliberately separate from timeouts: the driver enforces timeouts
//! itself.

use std::fmt;
use std::io;

pub mod tcp;
mod udp;
pub use udp::{Datagram, UdpTransport};

/// A connectivity failure while talking to an upstream.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransportError {
    /// The upstream's host or network could not be reached.
    Unreachable,
    /// The upstream refused the connection (or answered with ICMP port
    /// unreachable).
    Refused,
    /// The connection was reset or aborted.
    Reset,
    /// The upstream closed the TCP connection before sending a whole
    /// message.
    Closed,
    /// Some other I/O error.
    Other(io::ErrorKind),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Reset,
            io::ErrorKind::UnexpectedEof => Self::Closed,
            io::ErrorKind::AddrNotAvailable => Self::Unreachable,
            kind => {
                // HostUnreachable and NetworkUnreachable are not yet
                // stable io::ErrorKind variants; fall back to errno.
                if is_unreachable_errno(e.raw_os_error()) {
                    Self::Unreachable
                } else {
                    Self::Other(kind)
                }
            }
        }
    }
}

/// Checks for ENETUNREACH and EHOSTUNREACH (Linux and the BSDs).
fn is_unreachable_errno(errno: Option<i32>) -> bool {
    match errno {
        #[cfg(target_os = "linux")]
        Some(101 | 113) => true,
        #[cfg(any(
            target_os = "macos",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        Some(51 | 65) => true,
        _ => false,
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("upstream unreachable"),
            Self::Refused => f.write_str("connection refused"),
            Self::Reset => f.write_str("connection reset"),
            Self::Closed => f.write_str("connection closed before a whole message was read"),
            Self::Other(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_kinds() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(TransportError::from(refused), TransportError::Refused);
        let reset = io::Error::from(io::ErrorKind::BrokenPipe);
        assert_eq!(TransportError::from(reset), TransportError::Reset);
        let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert_eq!(TransportError::from(eof), TransportError::Closed);
        let other = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            TransportError::from(other),
            TransportError::Other(io::ErrorKind::PermissionDenied)
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unreachable_errno_is_recognized() {
        let e = io::Error::from_raw_os_error(113);
        assert_eq!(TransportError::from(e), TransportError::Unreachable);
    }
}
