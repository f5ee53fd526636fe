//! Kernel error type shared by endpoints and request contexts.

use core::fmt;

/// Errors returned by emulated kernel objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// The endpoint's session capacity is exhausted
    MaxSessionsReached,
    /// The server side of the endpoint has been dropped
    EndpointClosed,
    /// A request body ended before all declared fields were read
    RequestTooShort {
        /// Bytes the field needed
        needed: usize,
        /// Bytes left in the body
        available: usize,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::MaxSessionsReached => write!(f, "max sessions reached"),
            KernelError::EndpointClosed => write!(f, "endpoint closed"),
            KernelError::RequestTooShort { needed, available } => {
                write!(
                    f,
                    "request too short: needed {} bytes, {} available",
                    needed, available
                )
            }
        }
    }
}
