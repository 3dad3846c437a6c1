use crate::dispatcher::{Dispatch, Dispatcher};
use std::sync::Arc;
use stile_core::AccessRecord;

/// Destination for completed access records.
///
/// Called on the request path: implementations must return promptly and
/// never block on I/O.
pub trait RequestLogger: Send + Sync {
    fn log(&self, record: Arc<AccessRecord>) -> Dispatch;
}

impl RequestLogger for Dispatcher {
    fn log(&self, record: Arc<AccessRecord>) -> Dispatch {
        self.submit(record)
    }
}

impl<L: RequestLogger + ?Sized> RequestLogger for Arc<L> {
    fn log(&self, record: Arc<AccessRecord>) -> Dispatch {
        (**self).log(record)
    }
}
