//! Service manager error type and guest result-code mapping.

use core::fmt;

use lumen_ipc::result;
use lumen_kernel::KernelError;

/// Errors returned by the service directory and its dispatcher.
///
/// Every variant maps to a guest-visible result code; none is fatal to the
/// emulator process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmError {
    /// Service name length was 0 or greater than 8
    InvalidNameSize,
    /// Service name contained an interior NUL byte
    NameContainsNul,
    /// A service is already registered under this name
    AlreadyRegistered,
    /// No service is registered under this name
    NotRegistered,
    /// Failure propagated unchanged from the endpoint/session primitive
    Kernel(KernelError),
}

impl SmError {
    /// The result code pushed to the guest for this error.
    pub fn result_code(&self) -> u32 {
        match self {
            SmError::InvalidNameSize => result::ERR_INVALID_NAME_SIZE,
            SmError::NameContainsNul => result::ERR_NAME_CONTAINS_NUL,
            SmError::AlreadyRegistered => result::ERR_ALREADY_REGISTERED,
            SmError::NotRegistered => result::ERR_SERVICE_NOT_REGISTERED,
            SmError::Kernel(KernelError::MaxSessionsReached) => {
                result::ERR_MAX_CONNECTIONS_REACHED
            }
            SmError::Kernel(KernelError::EndpointClosed) => result::ERR_ENDPOINT_CLOSED,
            SmError::Kernel(KernelError::RequestTooShort { .. }) => {
                result::ERR_MALFORMED_REQUEST
            }
        }
    }
}

impl fmt::Display for SmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmError::InvalidNameSize => write!(f, "invalid service name size"),
            SmError::NameContainsNul => write!(f, "service name contains NUL"),
            SmError::AlreadyRegistered => write!(f, "service already registered"),
            SmError::NotRegistered => write!(f, "service not registered"),
            SmError::Kernel(e) => write!(f, "kernel error: {}", e),
        }
    }
}

impl From<KernelError> for SmError {
    fn from(e: KernelError) -> Self {
        SmError::Kernel(e)
    }
}
