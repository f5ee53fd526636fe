//! Lumen HLE service manager
//!
//! High-level emulation of the guest kernel's name-based IPC broker: guest
//! server processes register named services here, and guest client
//! processes resolve a name to a live session.
//!
//! # Protocol
//!
//! Guests talk to the broker through its reserved `sm:` endpoint:
//!
//! - `SM_INITIALIZE (0x0000)`: handshake probe, always succeeds
//! - `SM_GET_SERVICE (0x0001)`: resolve a name to a session handle
//! - `SM_REGISTER_SERVICE (0x0002)`: reserved, not implemented
//! - `SM_UNREGISTER_SERVICE (0x0003)`: reserved, not implemented
//!
//! Control-class requests bypass command dispatch and are forwarded to an
//! externally supplied controller.
//!
//! # Capacity fallback
//!
//! `GetService` has a two-tier failure shape the guest depends on: a name
//! that does not resolve is a plain error status, but a resolved endpoint
//! whose session capacity is exhausted answers with
//! `ERR_MAX_CONNECTIONS_REACHED` *plus* a reference to the client endpoint
//! itself, so the caller holds a retryable capability instead of a dead
//! end.

mod controller;
mod directory;
mod dispatcher;
mod error;
mod name;

pub use controller::{ControlForwarder, Controller};
pub use directory::{ServiceDirectory, ServiceInfo};
pub use dispatcher::SmDispatcher;
pub use error::SmError;
pub use name::{decode_service_name, validate_service_name};
