use crate::context::ServerContext;
use async_trait::async_trait;
use serde::Serialize;

/// Error returned by a [`Handler`]. Serialized into the access record as
/// the response body.
pub trait AccessError: Serialize + Send {
    /// HTTP-equivalent status recorded for this error.
    fn status(&self) -> u16 {
        500
    }
}

/// A unary server handler.
#[async_trait]
pub trait Handler: Send + Sync {
    type Request: Serialize + Send + 'static;
    type Reply: Serialize + Send;
    type Error: AccessError;

    async fn handle(
        &self,
        ctx: &ServerContext,
        request: Self::Request,
    ) -> Result<Self::Reply, Self::Error>;
}
