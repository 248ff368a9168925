//! Socket error classification shared by the UDP loops

use std::io;

/// Errors that only mean "nothing useful arrived", e.g. an ICMP port
/// unreachable surfaced on the socket by some platforms. Anything else
/// is a broken socket and ends the loop.
pub(crate) fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
    )
}
