//! IPC Protocol Constants for the Lumen emulator
//!
//! This crate defines:
//! - **Service manager command IDs** (guest → `sm:` requests)
//! - **Result codes** (returned to the guest in every response)
//! - **Service name limits** shared by the validator and the wire decoder
//!
//! It is the **single source of truth** for these constants, eliminating
//! duplication across crates.
//!
//! # Service Manager Command IDs
//!
//! | ID     | Command           |
//! |--------|-------------------|
//! | 0x0000 | Initialize        |
//! | 0x0001 | GetService        |
//! | 0x0002 | RegisterService   (reserved, not implemented) |
//! | 0x0003 | UnregisterService (reserved, not implemented) |
//!
//! # Result Codes
//!
//! Bit 31 set marks a failure; `RESULT_SUCCESS` is zero. The guest branches
//! on these values, so they are fixed process-wide here.
//!
//! # Usage
//!
//! ```rust
//! use lumen_ipc::{cmd, result};
//!
//! let command = cmd::SM_GET_SERVICE;
//! let status = result::RESULT_SUCCESS;
//! ```

#![no_std]

/// Maximum length of a service name in bytes.
pub const MAX_SERVICE_NAME_LEN: usize = 8;

/// Length of the fixed name field in a GetService request. One byte longer
/// than the maximum name so an 8-byte name still carries a NUL terminator.
pub const SERVICE_NAME_WIRE_LEN: usize = 9;

/// Reserved name under which the service manager registers itself.
pub const SM_PORT_NAME: &str = "sm:";

/// Session capacity of the service manager's own endpoint.
pub const SM_MAX_SESSIONS: u32 = 4;

/// Service manager command IDs (first word of a request).
pub mod cmd {
    /// Liveness/handshake probe. No arguments, always succeeds.
    pub const SM_INITIALIZE: u32 = 0x0000;
    /// Resolve a service name to a session handle.
    pub const SM_GET_SERVICE: u32 = 0x0001;
    /// Reserved command slot (present in the table, never implemented).
    pub const SM_REGISTER_SERVICE: u32 = 0x0002;
    /// Reserved command slot (present in the table, never implemented).
    pub const SM_UNREGISTER_SERVICE: u32 = 0x0003;
}

/// Result codes pushed as the status word of every response.
pub mod result {
    /// Operation succeeded.
    pub const RESULT_SUCCESS: u32 = 0x0000_0000;
    /// Service name length was 0 or greater than 8.
    pub const ERR_INVALID_NAME_SIZE: u32 = 0x8000_0001;
    /// Service name contained an interior NUL byte.
    pub const ERR_NAME_CONTAINS_NUL: u32 = 0x8000_0002;
    /// A service is already registered under this name.
    pub const ERR_ALREADY_REGISTERED: u32 = 0x8000_0003;
    /// No service is registered under this name.
    pub const ERR_SERVICE_NOT_REGISTERED: u32 = 0x8000_0004;
    /// The endpoint's session capacity is exhausted. Responses carrying
    /// this code also carry the client endpoint as a retryable capability.
    pub const ERR_MAX_CONNECTIONS_REACHED: u32 = 0x8000_0005;
    /// The server side of the endpoint is gone.
    pub const ERR_ENDPOINT_CLOSED: u32 = 0x8000_0006;
    /// Request body ended before all declared fields were read.
    pub const ERR_MALFORMED_REQUEST: u32 = 0x8000_00FE;
    /// Command ID exists in the table but has no handler.
    pub const ERR_NOT_IMPLEMENTED: u32 = 0x8000_00FF;

    /// True for any failure code (bit 31 set).
    pub const fn is_failure(code: u32) -> bool {
        code & 0x8000_0000 != 0
    }
}
