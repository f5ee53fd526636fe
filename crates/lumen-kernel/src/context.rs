//! Request context - the marshalling carrier for decoded guest requests.
//!
//! A context carries one inbound request (command ID, routing kind, and a
//! little-endian body read through a cursor) and collects exactly one
//! outbound response (status word, trailing data words, transferred
//! objects). The raw wire layer owns encode/decode; service code only sees
//! this abstraction.

use crate::endpoint::{ClientEndpoint, Session};
use crate::error::KernelError;

/// How a request should be routed by a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Ordinary command, dispatched by command ID
    Normal,
    /// Management request, forwarded to the controller collaborator
    Control,
}

/// A kernel object transferred in a response.
pub enum Object {
    /// A freshly connected session (ownership moves to the guest)
    Session(Session),
    /// A shared client endpoint reference (retryable capability)
    Endpoint(ClientEndpoint),
}

/// Outbound response: one status word, optional data words, optional
/// transferred objects.
pub struct Response {
    /// Status/result code (see `lumen_ipc::result`)
    pub status: u32,
    /// Trailing data words
    pub words: Vec<u32>,
    /// Transferred kernel objects
    pub objects: Vec<Object>,
}

impl Response {
    /// Response carrying only a status word.
    pub fn new(status: u32) -> Self {
        Self {
            status,
            words: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Append a trailing data word.
    pub fn with_word(mut self, word: u32) -> Self {
        self.words.push(word);
        self
    }

    /// Append a transferred object.
    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }
}

/// One in-flight guest request.
pub struct RequestContext {
    kind: RequestKind,
    command: u32,
    body: Vec<u8>,
    cursor: usize,
    response: Option<Response>,
}

impl RequestContext {
    /// Context for an ordinary command request.
    pub fn normal(command: u32) -> Self {
        Self::with_kind(RequestKind::Normal, command)
    }

    /// Context for a control-class (management) request.
    pub fn control(command: u32) -> Self {
        Self::with_kind(RequestKind::Control, command)
    }

    fn with_kind(kind: RequestKind, command: u32) -> Self {
        Self {
            kind,
            command,
            body: Vec::new(),
            cursor: 0,
            response: None,
        }
    }

    /// Routing kind of this request.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Command ID of this request.
    pub fn command(&self) -> u32 {
        self.command
    }

    // =========================================================================
    // Inbound body construction (wire layer / emulated guests / tests)
    // =========================================================================

    /// Append a little-endian u32 field to the request body.
    pub fn push_u32(mut self, value: u32) -> Self {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append raw bytes to the request body.
    pub fn push_raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    // =========================================================================
    // Ordered field extraction (service code)
    // =========================================================================

    /// Pop the next little-endian u32 field.
    pub fn pop_u32(&mut self) -> Result<u32, KernelError> {
        let raw = self.pop_raw(4)?;
        // pop_raw guarantees exactly 4 bytes
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Pop the next `len` raw bytes.
    pub fn pop_raw(&mut self, len: usize) -> Result<Vec<u8>, KernelError> {
        let available = self.body.len() - self.cursor;
        if available < len {
            return Err(KernelError::RequestTooShort {
                needed: len,
                available,
            });
        }
        let bytes = self.body[self.cursor..self.cursor + len].to_vec();
        self.cursor += len;
        Ok(bytes)
    }

    // =========================================================================
    // Response
    // =========================================================================

    /// Install the response for this request.
    ///
    /// Each request gets exactly one response; replying twice is a host
    /// bug, not a guest error.
    pub fn reply(&mut self, response: Response) {
        assert!(
            self.response.is_none(),
            "request replied to twice (command 0x{:04x})",
            self.command
        );
        self.response = Some(response);
    }

    /// The installed response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Take the installed response for wire encoding.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
