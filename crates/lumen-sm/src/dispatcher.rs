//! The guest-facing `sm:` request dispatcher.
//!
//! Stateless across calls: each request context is decoded, answered, and
//! returned. The interesting path is `GetService`'s three-way branch:
//! resolve failure, connected session, or capacity exhaustion with the
//! endpoint handed back as a retryable capability.

use std::sync::Arc;

use tracing::{debug, error, warn};

use lumen_ipc::{cmd, result, SERVICE_NAME_WIRE_LEN, SM_PORT_NAME};
use lumen_kernel::{
    ClientEndpoint, KernelError, Object, RequestContext, RequestKind, Response,
    ServerEndpoint, Session,
};

use crate::directory::ServiceDirectory;
use crate::error::SmError;
use crate::name::decode_service_name;

/// Outcome of one service resolution.
enum ConnectOutcome {
    /// Connected; the session moves to the guest
    Connected(Session),
    /// Capacity exhausted; the guest gets the endpoint to retry with
    Retry(ClientEndpoint),
    /// Resolution or connection failed outright
    Failed(SmError),
}

/// Dispatcher for the broker's own `sm:` endpoint.
pub struct SmDispatcher {
    directory: Arc<ServiceDirectory>,
    /// Server side of the `sm:` registration (the dispatcher's accept loop)
    server: ServerEndpoint,
}

impl SmDispatcher {
    pub(crate) fn new(directory: Arc<ServiceDirectory>, server: ServerEndpoint) -> Self {
        Self { directory, server }
    }

    /// The reserved name this dispatcher is registered under.
    pub fn port_name(&self) -> &'static str {
        SM_PORT_NAME
    }

    /// Server side of the dispatcher's own endpoint.
    pub fn server_endpoint(&self) -> &ServerEndpoint {
        &self.server
    }

    /// Route one decoded request.
    pub fn handle_request(&self, ctx: &mut RequestContext) {
        if ctx.kind() == RequestKind::Control {
            self.directory.invoke_control_request(ctx);
            return;
        }

        match ctx.command() {
            cmd::SM_INITIALIZE => self.initialize(ctx),
            cmd::SM_GET_SERVICE => self.get_service(ctx),
            cmd::SM_REGISTER_SERVICE | cmd::SM_UNREGISTER_SERVICE => {
                warn!(command = ctx.command(), "reserved command not implemented");
                ctx.reply(Response::new(result::ERR_NOT_IMPLEMENTED));
            }
            other => {
                warn!(command = other, "unknown command");
                ctx.reply(Response::new(result::ERR_NOT_IMPLEMENTED));
            }
        }
    }

    /// `SM_INITIALIZE`: handshake probe. Always succeeds, touches nothing.
    fn initialize(&self, ctx: &mut RequestContext) {
        debug!("called");
        ctx.reply(Response::new(result::RESULT_SUCCESS));
    }

    /// `SM_GET_SERVICE`: resolve a name field to a session handle.
    ///
    /// Request: two reserved u32 fields (guest-side metadata, not
    /// interpreted here) followed by the 9-byte name field.
    fn get_service(&self, ctx: &mut RequestContext) {
        let (_unk1, _unk2, name) = match Self::parse_get_service(ctx) {
            Ok(fields) => fields,
            Err(e) => {
                error!(code = e.result_code(), "malformed GetService request");
                ctx.reply(Response::new(e.result_code()));
                return;
            }
        };
        let display_name = String::from_utf8_lossy(&name).into_owned();

        match self.resolve(&name) {
            ConnectOutcome::Connected(session) => {
                debug!(service = %display_name, session = %session.object_id(), "called");
                ctx.reply(
                    Response::new(result::RESULT_SUCCESS).with_object(Object::Session(session)),
                );
            }
            ConnectOutcome::Retry(endpoint) => {
                warn!(
                    service = %display_name,
                    endpoint = %endpoint.object_id(),
                    "max connections reached, returning endpoint"
                );
                ctx.reply(
                    Response::new(result::ERR_MAX_CONNECTIONS_REACHED)
                        .with_object(Object::Endpoint(endpoint)),
                );
            }
            ConnectOutcome::Failed(e) => {
                error!(service = %display_name, code = e.result_code(), "called");
                ctx.reply(Response::new(e.result_code()));
            }
        }
    }

    fn parse_get_service(ctx: &mut RequestContext) -> Result<(u32, u32, Vec<u8>), SmError> {
        let unk1 = ctx.pop_u32()?;
        let unk2 = ctx.pop_u32()?;
        let name_buf = ctx.pop_raw(SERVICE_NAME_WIRE_LEN)?;
        Ok((unk1, unk2, decode_service_name(&name_buf)))
    }

    /// Lookup, then connect. Split so capacity exhaustion can fall back
    /// to the endpoint reference obtained by the successful lookup.
    fn resolve(&self, name: &[u8]) -> ConnectOutcome {
        let endpoint = match self.directory.lookup(name) {
            Ok(endpoint) => endpoint,
            Err(e) => return ConnectOutcome::Failed(e),
        };

        match endpoint.connect() {
            Ok(session) => ConnectOutcome::Connected(session),
            Err(KernelError::MaxSessionsReached) => ConnectOutcome::Retry(endpoint),
            Err(other) => ConnectOutcome::Failed(SmError::Kernel(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;

    struct NullController;

    impl Controller for NullController {
        fn invoke(&self, ctx: &mut RequestContext) {
            ctx.reply(Response::new(result::RESULT_SUCCESS));
        }
    }

    fn installed() -> (Arc<ServiceDirectory>, Arc<SmDispatcher>) {
        let directory = Arc::new(ServiceDirectory::new());
        let dispatcher =
            ServiceDirectory::install_interfaces(&directory, Box::new(NullController));
        (directory, dispatcher)
    }

    fn get_service_request(name_field: &[u8; 9]) -> RequestContext {
        RequestContext::normal(cmd::SM_GET_SERVICE)
            .push_u32(0)
            .push_u32(0)
            .push_raw(name_field)
    }

    #[test]
    fn install_registers_the_sm_port() {
        let (directory, dispatcher) = installed();
        assert_eq!(dispatcher.port_name(), "sm:");
        let endpoint = directory.lookup(b"sm:").unwrap();
        assert_eq!(endpoint.max_sessions(), lumen_ipc::SM_MAX_SESSIONS);

        // Connecting to sm: lands on the dispatcher's accept side.
        let _session = directory.connect(b"sm:").unwrap();
        assert!(dispatcher.server_endpoint().accept().is_some());
    }

    #[test]
    #[should_panic(expected = "already installed")]
    fn double_install_panics() {
        let directory = Arc::new(ServiceDirectory::new());
        let _first =
            ServiceDirectory::install_interfaces(&directory, Box::new(NullController));
        let _second =
            ServiceDirectory::install_interfaces(&directory, Box::new(NullController));
    }

    #[test]
    fn initialize_always_succeeds() {
        let (directory, dispatcher) = installed();

        let mut ctx = RequestContext::normal(cmd::SM_INITIALIZE);
        dispatcher.handle_request(&mut ctx);
        assert_eq!(ctx.response().unwrap().status, result::RESULT_SUCCESS);

        // Still succeeds with directory state present.
        let _server = directory.register(b"vfs", 1).unwrap();
        let mut ctx = RequestContext::normal(cmd::SM_INITIALIZE);
        dispatcher.handle_request(&mut ctx);
        assert_eq!(ctx.response().unwrap().status, result::RESULT_SUCCESS);
        assert!(ctx.response().unwrap().objects.is_empty());
    }

    #[test]
    fn get_service_returns_a_session_object() {
        let (directory, dispatcher) = installed();
        let _server = directory.register(b"fs:USER", 4).unwrap();

        let mut ctx = get_service_request(b"fs:USER\0\0");
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, result::RESULT_SUCCESS);
        assert_eq!(resp.objects.len(), 1);
        match &resp.objects[0] {
            Object::Session(session) => assert_eq!(session.service_name(), "fs:USER"),
            Object::Endpoint(_) => panic!("expected a session object"),
        }
    }

    #[test]
    fn get_service_reserved_fields_do_not_affect_outcome() {
        let (directory, dispatcher) = installed();
        let _server = directory.register(b"gpu", 4).unwrap();

        for (unk1, unk2) in [(0, 0), (u32::MAX, 0x1234_5678), (1, 2)] {
            let mut ctx = RequestContext::normal(cmd::SM_GET_SERVICE)
                .push_u32(unk1)
                .push_u32(unk2)
                .push_raw(b"gpu\0\0\0\0\0\0");
            dispatcher.handle_request(&mut ctx);
            assert_eq!(ctx.response().unwrap().status, result::RESULT_SUCCESS);
        }
    }

    #[test]
    fn get_service_unknown_name_fails_without_objects() {
        let (_directory, dispatcher) = installed();

        let mut ctx = get_service_request(b"nope\0\0\0\0\0");
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, result::ERR_SERVICE_NOT_REGISTERED);
        assert!(resp.objects.is_empty());
    }

    #[test]
    fn get_service_capacity_exhaustion_returns_the_endpoint() {
        let (directory, dispatcher) = installed();
        let _server = directory.register(b"audio", 1).unwrap();
        let _held = directory.connect(b"audio").unwrap();

        let mut ctx = get_service_request(b"audio\0\0\0\0");
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, result::ERR_MAX_CONNECTIONS_REACHED);
        assert_eq!(resp.objects.len(), 1);
        match &resp.objects[0] {
            Object::Endpoint(endpoint) => {
                assert_eq!(endpoint.name(), "audio");
                assert_eq!(endpoint.max_sessions(), 1);
            }
            Object::Session(_) => panic!("expected the endpoint, not a session"),
        }
    }

    #[test]
    fn get_service_other_connect_failures_carry_no_objects() {
        let (directory, dispatcher) = installed();
        let server = directory.register(b"dead", 1).unwrap();
        drop(server);

        let mut ctx = get_service_request(b"dead\0\0\0\0\0");
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, result::ERR_ENDPOINT_CLOSED);
        assert!(resp.objects.is_empty());
    }

    #[test]
    fn get_service_short_body_is_malformed() {
        let (_directory, dispatcher) = installed();

        let mut ctx = RequestContext::normal(cmd::SM_GET_SERVICE).push_u32(0);
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, result::ERR_MALFORMED_REQUEST);
        assert!(resp.objects.is_empty());
    }

    #[test]
    fn reserved_and_unknown_commands_answer_not_implemented() {
        let (_directory, dispatcher) = installed();

        for command in [
            cmd::SM_REGISTER_SERVICE,
            cmd::SM_UNREGISTER_SERVICE,
            0x00FF,
        ] {
            let mut ctx = RequestContext::normal(command);
            dispatcher.handle_request(&mut ctx);
            assert_eq!(
                ctx.response().unwrap().status,
                result::ERR_NOT_IMPLEMENTED
            );
        }
    }

    #[test]
    fn control_requests_bypass_command_dispatch() {
        struct MarkerController;
        impl Controller for MarkerController {
            fn invoke(&self, ctx: &mut RequestContext) {
                ctx.reply(Response::new(0x4242).with_word(9));
            }
        }

        let directory = Arc::new(ServiceDirectory::new());
        let dispatcher =
            ServiceDirectory::install_interfaces(&directory, Box::new(MarkerController));

        // Same command ID as GetService, but control-class: must reach the
        // controller, not the GetService handler.
        let mut ctx = RequestContext::control(cmd::SM_GET_SERVICE);
        dispatcher.handle_request(&mut ctx);

        let resp = ctx.response().unwrap();
        assert_eq!(resp.status, 0x4242);
        assert_eq!(resp.words, vec![9]);
    }
}
