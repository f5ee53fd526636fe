//! Control request forwarding.
//!
//! Management operations (enumerate, reconfigure) live in an external
//! controller collaborator. The broker only routes a distinguished request
//! class to it, untouched.

use lumen_kernel::RequestContext;

/// External controller collaborator for management requests.
pub trait Controller: Send + Sync {
    /// Handle one control-class request.
    fn invoke(&self, ctx: &mut RequestContext);
}

/// Routes control-class requests to the installed controller.
pub struct ControlForwarder {
    controller: Box<dyn Controller>,
}

impl ControlForwarder {
    /// Wrap a controller collaborator.
    pub fn new(controller: Box<dyn Controller>) -> Self {
        Self { controller }
    }

    /// Delegate unconditionally to the controller.
    pub fn forward(&self, ctx: &mut RequestContext) {
        self.controller.invoke(ctx);
    }
}
