//! The service directory: name → client endpoint mapping.
//!
//! Registration is rare (service bring-up) while lookup/connect runs on
//! every service resolution, so the map sits behind a reader-biased
//! `RwLock`. Endpoint connects happen outside the lock; capacity
//! accounting is the endpoint's own (atomic) concern.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use lumen_ipc::{SM_MAX_SESSIONS, SM_PORT_NAME};
use lumen_kernel::{
    create_endpoint_pair, ClientEndpoint, RequestContext, ServerEndpoint, Session,
};

use crate::controller::{ControlForwarder, Controller};
use crate::dispatcher::SmDispatcher;
use crate::error::SmError;
use crate::name::validate_service_name;

/// Diagnostic snapshot of one directory entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Registered name (lossy UTF-8 for display)
    pub name: String,
    /// Immutable session capacity
    pub max_sessions: u32,
    /// Sessions currently live
    pub active_sessions: u32,
}

/// The name → client-endpoint directory.
///
/// Holds the canonical reference to every registered service's client
/// endpoint; resolving callers get clones (shared references). Entries are
/// inserted exactly once per name and live for the rest of the emulated
/// process; there is no unregister on the exercised surface, though the
/// map shape would admit one.
pub struct ServiceDirectory {
    services: RwLock<BTreeMap<Vec<u8>, ClientEndpoint>>,
    /// The installed dispatcher, if any. Weak: the dispatcher owns an Arc
    /// to the directory, not the other way around.
    sm_interface: RwLock<Weak<SmDispatcher>>,
    control: RwLock<Option<ControlForwarder>>,
}

impl ServiceDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            services: RwLock::new(BTreeMap::new()),
            sm_interface: RwLock::new(Weak::new()),
            control: RwLock::new(None),
        }
    }

    /// Register a service under `name`, sized to `max_sessions`.
    ///
    /// Creates the endpoint pair, keeps the client side, and hands the
    /// server side back to the registrant's accept loop.
    pub fn register(
        &self,
        name: &[u8],
        max_sessions: u32,
    ) -> Result<ServerEndpoint, SmError> {
        validate_service_name(name)?;

        // The duplicate check and the insert stay under one write guard so
        // concurrent registrations of the same name cannot both pass.
        let mut services = self.services.write().unwrap();
        if services.contains_key(name) {
            return Err(SmError::AlreadyRegistered);
        }

        let display_name = String::from_utf8_lossy(name).into_owned();
        let (server, client) = create_endpoint_pair(max_sessions, &display_name);
        services.insert(name.to_vec(), client);

        debug!(service = %display_name, max_sessions, "registered service");
        Ok(server)
    }

    /// Resolve `name` to a new shared reference to its client endpoint.
    pub fn lookup(&self, name: &[u8]) -> Result<ClientEndpoint, SmError> {
        validate_service_name(name)?;
        self.services
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(SmError::NotRegistered)
    }

    /// Resolve `name` and establish a session.
    ///
    /// Endpoint failures (capacity exhaustion included) propagate
    /// unchanged.
    pub fn connect(&self, name: &[u8]) -> Result<Session, SmError> {
        let endpoint = self.lookup(name)?;
        // Connect outside the directory lock; the endpoint's own atomics
        // guard its capacity.
        Ok(endpoint.connect()?)
    }

    /// Number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.read().unwrap().len()
    }

    /// Snapshot of all registered services.
    pub fn list_services(&self) -> Vec<ServiceInfo> {
        self.services
            .read()
            .unwrap()
            .values()
            .map(|endpoint| ServiceInfo {
                name: endpoint.name().to_string(),
                max_sessions: endpoint.max_sessions(),
                active_sessions: endpoint.active_sessions(),
            })
            .collect()
    }

    /// Install the guest-facing interfaces: the `sm:` dispatcher and the
    /// control forwarder.
    ///
    /// Performed exactly once per process lifetime; a second call while
    /// the first dispatcher is alive is a host bug and panics.
    pub fn install_interfaces(
        directory: &Arc<ServiceDirectory>,
        controller: Box<dyn Controller>,
    ) -> Arc<SmDispatcher> {
        let mut installed = directory.sm_interface.write().unwrap();
        assert!(
            installed.upgrade().is_none(),
            "service manager interfaces already installed"
        );

        let server = match directory.register(SM_PORT_NAME.as_bytes(), SM_MAX_SESSIONS) {
            Ok(server) => server,
            Err(e) => panic!("failed to register {}: {}", SM_PORT_NAME, e),
        };

        let dispatcher = Arc::new(SmDispatcher::new(Arc::clone(directory), server));
        *installed = Arc::downgrade(&dispatcher);
        *directory.control.write().unwrap() = Some(ControlForwarder::new(controller));

        debug!(port = SM_PORT_NAME, "installed service manager interfaces");
        dispatcher
    }

    /// Forward a control-class request to the installed controller.
    pub fn invoke_control_request(&self, ctx: &mut RequestContext) {
        let control = self.control.read().unwrap();
        match control.as_ref() {
            Some(forwarder) => forwarder.forward(ctx),
            // Control traffic before install_interfaces is a host bug.
            None => panic!("control request before install_interfaces"),
        }
    }
}

impl Default for ServiceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_kernel::KernelError;

    #[test]
    fn register_then_lookup_returns_the_same_endpoint() {
        let dir = ServiceDirectory::new();
        let server = dir.register(b"vfs", 2).unwrap();
        assert_eq!(server.name(), "vfs");

        let endpoint = dir.lookup(b"vfs").unwrap();
        assert_eq!(endpoint.name(), "vfs");
        assert_eq!(endpoint.max_sessions(), 2);
    }

    #[test]
    fn duplicate_registration_fails_and_first_stays_usable() {
        let dir = ServiceDirectory::new();
        let server = dir.register(b"dup", 1).unwrap();
        assert_eq!(
            dir.register(b"dup", 5).unwrap_err(),
            SmError::AlreadyRegistered
        );

        // First registration still serves connects.
        let _session = dir.connect(b"dup").unwrap();
        assert!(server.accept().is_some());
    }

    #[test]
    fn lookup_and_connect_on_unknown_name_fail() {
        let dir = ServiceDirectory::new();
        assert_eq!(dir.lookup(b"nope").unwrap_err(), SmError::NotRegistered);
        assert_eq!(dir.connect(b"nope").unwrap_err(), SmError::NotRegistered);
    }

    #[test]
    fn invalid_names_are_rejected_before_map_access() {
        let dir = ServiceDirectory::new();
        assert_eq!(dir.register(b"", 1).unwrap_err(), SmError::InvalidNameSize);
        assert_eq!(
            dir.lookup(b"waytoolongname").unwrap_err(),
            SmError::InvalidNameSize
        );
        assert_eq!(
            dir.connect(b"a\0b").unwrap_err(),
            SmError::NameContainsNul
        );
    }

    #[test]
    fn connect_propagates_capacity_exhaustion() {
        let dir = ServiceDirectory::new();
        let _server = dir.register(b"small", 1).unwrap();

        let _session = dir.connect(b"small").unwrap();
        assert_eq!(
            dir.connect(b"small").unwrap_err(),
            SmError::Kernel(KernelError::MaxSessionsReached)
        );
    }

    #[test]
    fn snapshot_reflects_registrations_and_live_sessions() {
        let dir = ServiceDirectory::new();
        let _a = dir.register(b"alpha", 3).unwrap();
        let _b = dir.register(b"beta", 1).unwrap();
        let _session = dir.connect(b"alpha").unwrap();

        assert_eq!(dir.service_count(), 2);
        let infos = dir.list_services();
        let alpha = infos.iter().find(|i| i.name == "alpha").unwrap();
        assert_eq!(alpha.max_sessions, 3);
        assert_eq!(alpha.active_sessions, 1);

        // Snapshots serialize for diagnostics.
        let json = serde_json::to_string(&infos).unwrap();
        assert!(json.contains("\"beta\""));
    }
}
