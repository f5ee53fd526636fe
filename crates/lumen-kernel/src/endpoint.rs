//! Endpoint pairs and sessions.
//!
//! An endpoint pair is created once per registered service and lives for
//! the rest of the emulated process. The server side goes to the service's
//! accept loop; the client side is held (and cloned out) by the service
//! directory. Each successful `connect` claims one capacity slot and
//! produces a client/server session pair; dropping the client `Session`
//! releases the slot.

use core::fmt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::KernelError;
use crate::types::{next_object_id, ObjectId};

/// State shared between the two sides of an endpoint pair and all live
/// sessions connected through it.
struct EndpointShared {
    /// Service name the pair was created for (log/diagnostic use)
    name: String,
    /// Immutable session capacity
    max_sessions: u32,
    /// Live sessions currently claimed against the capacity
    active_sessions: AtomicU32,
    /// Cleared when the server side is dropped
    server_alive: AtomicBool,
    /// Server-side halves of sessions awaiting accept
    pending_accepts: Mutex<VecDeque<ServerSession>>,
}

/// Create a bound endpoint pair for `name`, sized to `max_sessions`.
pub fn create_endpoint_pair(max_sessions: u32, name: &str) -> (ServerEndpoint, ClientEndpoint) {
    let shared = Arc::new(EndpointShared {
        name: name.to_string(),
        max_sessions,
        active_sessions: AtomicU32::new(0),
        server_alive: AtomicBool::new(true),
        pending_accepts: Mutex::new(VecDeque::new()),
    });

    let server = ServerEndpoint {
        shared: Arc::clone(&shared),
        object_id: next_object_id(),
    };
    let client = ClientEndpoint {
        shared,
        object_id: next_object_id(),
    };

    debug!(
        name = %client.shared.name,
        server_id = %server.object_id,
        client_id = %client.object_id,
        max_sessions,
        "created endpoint pair"
    );

    (server, client)
}

/// Receiving side of a named service. Exclusively owned by the registrant.
pub struct ServerEndpoint {
    shared: Arc<EndpointShared>,
    object_id: ObjectId,
}

impl ServerEndpoint {
    /// Service name this endpoint was created for.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Kernel object ID of this endpoint.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Take the next pending server-side session, if any.
    pub fn accept(&self) -> Option<ServerSession> {
        let session = self
            .shared
            .pending_accepts
            .lock()
            .unwrap()
            .pop_front();
        if let Some(ref s) = session {
            debug!(name = %self.shared.name, session_id = %s.object_id(), "accepted session");
        }
        session
    }
}

impl Drop for ServerEndpoint {
    fn drop(&mut self) {
        self.shared.server_alive.store(false, Ordering::Release);
    }
}

impl fmt::Debug for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEndpoint")
            .field("name", &self.shared.name)
            .field("object_id", &self.object_id)
            .finish()
    }
}

/// Connectable side of a named service. `Clone` produces a new shared
/// reference to the same endpoint; the directory holds one reference and
/// hands out others to resolving callers.
#[derive(Clone)]
pub struct ClientEndpoint {
    shared: Arc<EndpointShared>,
    object_id: ObjectId,
}

impl ClientEndpoint {
    /// Service name this endpoint was created for.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Kernel object ID of this endpoint.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Immutable session capacity.
    pub fn max_sessions(&self) -> u32 {
        self.shared.max_sessions
    }

    /// Sessions currently live against this endpoint.
    pub fn active_sessions(&self) -> u32 {
        self.shared.active_sessions.load(Ordering::Acquire)
    }

    /// Establish a new session.
    ///
    /// Claims a capacity slot atomically, so concurrent connects on the
    /// same endpoint never oversubscribe it. Fails with
    /// `MaxSessionsReached` when all slots are taken and `EndpointClosed`
    /// when the server side is gone.
    pub fn connect(&self) -> Result<Session, KernelError> {
        if !self.shared.server_alive.load(Ordering::Acquire) {
            return Err(KernelError::EndpointClosed);
        }

        self.shared
            .active_sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                if active < self.shared.max_sessions {
                    Some(active + 1)
                } else {
                    None
                }
            })
            .map_err(|_| KernelError::MaxSessionsReached)?;

        let session = Session {
            shared: Arc::clone(&self.shared),
            object_id: next_object_id(),
        };
        let server_session = ServerSession {
            name: self.shared.name.clone(),
            object_id: next_object_id(),
            peer: session.object_id,
        };

        debug!(
            name = %self.shared.name,
            session_id = %session.object_id,
            active = self.active_sessions(),
            max = self.shared.max_sessions,
            "session connected"
        );

        self.shared
            .pending_accepts
            .lock()
            .unwrap()
            .push_back(server_session);

        Ok(session)
    }
}

impl fmt::Debug for ClientEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEndpoint")
            .field("name", &self.shared.name)
            .field("object_id", &self.object_id)
            .field("max_sessions", &self.shared.max_sessions)
            .finish()
    }
}

/// Client half of a live session. Exclusively owned by the connecting
/// caller; dropping it releases the endpoint capacity slot it claimed.
pub struct Session {
    shared: Arc<EndpointShared>,
    object_id: ObjectId,
}

impl Session {
    /// Kernel object ID of this session.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Name of the service this session is connected to.
    pub fn service_name(&self) -> &str {
        &self.shared.name
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The client half owns the capacity slot; the server half is only
        // a delivery record.
        self.shared.active_sessions.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.shared.name)
            .field("object_id", &self.object_id)
            .finish()
    }
}

/// Server half of a live session, delivered through `ServerEndpoint::accept`.
#[derive(Debug)]
pub struct ServerSession {
    name: String,
    object_id: ObjectId,
    peer: ObjectId,
}

impl ServerSession {
    /// Kernel object ID of this session half.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Object ID of the client half this session is paired with.
    pub fn peer_object_id(&self) -> ObjectId {
        self.peer
    }

    /// Name of the service this session belongs to.
    pub fn service_name(&self) -> &str {
        &self.name
    }
}
