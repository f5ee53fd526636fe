//! Lumen emulated kernel primitives
//!
//! This crate implements the kernel objects the HLE service layer is built
//! on:
//! - Endpoint pairs (server/client sides of a named channel)
//! - Sessions (live connections claimed against an endpoint's capacity)
//! - Request contexts (marshalling carrier for decoded guest requests)
//! - Kernel-wide object ID assignment
//!
//! Guest threads are emulated as host threads, so every object here is
//! shared-state safe: endpoint capacity is claimed with lock-free atomics
//! and the server-side accept queue sits behind a mutex.

mod context;
mod endpoint;
mod error;
mod types;

pub use context::{Object, RequestContext, RequestKind, Response};
pub use endpoint::{
    create_endpoint_pair, ClientEndpoint, ServerEndpoint, ServerSession, Session,
};
pub use error::KernelError;
pub use types::ObjectId;
