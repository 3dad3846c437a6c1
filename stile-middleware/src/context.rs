use crate::transport::{HttpRequest, Transport};
use std::sync::Mutex;

/// Authenticated caller, as recorded by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: i64,
    pub username: String,
    pub node_id: i64,
}

/// Per-call server context: the transport plus values handlers publish
/// back to the interceptor.
pub struct ServerContext {
    transport: Box<dyn Transport>,
    user: Mutex<Option<UserIdentity>>,
}

impl ServerContext {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            user: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn http_request(&self) -> Option<&HttpRequest> {
        self.transport.http_request()
    }

    /// Record the caller once authenticated. The access record picks it up
    /// after the handler returns.
    pub fn set_user(&self, user: UserIdentity) {
        match self.user.lock() {
            Ok(mut slot) => *slot = Some(user),
            Err(poisoned) => *poisoned.into_inner() = Some(user),
        }
    }

    pub fn user(&self) -> Option<UserIdentity> {
        match self.user.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
