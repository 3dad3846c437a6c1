use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use stile_middleware::{AccessError, Handler, ServerContext, UserIdentity};
use stile_track::SignalSource;

/// Header carrying the authenticated user id, set by the edge proxy.
pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_NAME_HEADER: &str = "X-User-Name";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReply {
    pub id: u64,
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderError {
    pub code: u16,
    pub reason: String,
    pub message: String,
}

impl AccessError for OrderError {
    fn status(&self) -> u16 {
        self.code
    }
}

/// In-memory order intake.
#[derive(Default)]
pub struct OrderService {
    next_id: AtomicU64,
}

#[async_trait]
impl Handler for OrderService {
    type Request = CreateOrder;
    type Reply = OrderReply;
    type Error = OrderError;

    async fn handle(
        &self,
        ctx: &ServerContext,
        request: CreateOrder,
    ) -> Result<OrderReply, OrderError> {
        if let Some(user) = ctx.http_request().and_then(|req| {
            let user_id = req.header(USER_ID_HEADER)?.parse().ok()?;
            Some(UserIdentity {
                user_id,
                username: req.header(USER_NAME_HEADER).unwrap_or_default().to_string(),
                node_id: 0,
            })
        }) {
            ctx.set_user(user);
        }

        if request.sku.is_empty() || request.qty == 0 {
            return Err(OrderError {
                code: 400,
                reason: "INVALID_ORDER".into(),
                message: "sku and a positive qty are required".into(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(OrderReply {
            id,
            sku: request.sku,
            qty: request.qty,
        })
    }
}
