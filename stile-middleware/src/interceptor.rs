use crate::context::ServerContext;
use crate::handler::{AccessError, Handler};
use crate::logger::Level;
use crate::options::Options;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use stile_core::record::{self, IGNORED_BODY};
use stile_core::{AccessRecord, Request, Response};
use stile_track::{SignalSource, TrackingSignals};
use tracing::{Instrument, info_span};

/// Records one [`AccessRecord`] per HTTP call to the wrapped handler.
///
/// The handler's result is returned unchanged. Hand-off to the request
/// logger never blocks the call.
pub struct AccessLog<H> {
    inner: H,
    options: Options,
}

/// Wrap `handler` with access recording.
pub fn access_log<H: Handler>(handler: H, options: Options) -> AccessLog<H> {
    AccessLog {
        inner: handler,
        options,
    }
}

impl<H> AccessLog<H> {
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: Handler> Handler for AccessLog<H> {
    type Request = H::Request;
    type Reply = H::Reply;
    type Error = H::Error;

    async fn handle(
        &self,
        ctx: &ServerContext,
        request: Self::Request,
    ) -> Result<Self::Reply, Self::Error> {
        let start = Instant::now();
        let started_at = Utc::now();

        let Some(http) = ctx.http_request() else {
            return self.inner.handle(ctx, request).await;
        };
        let opts = &self.options;
        if !opts.ignore_prefix.is_empty() && http.path().starts_with(&opts.ignore_prefix) {
            return self.inner.handle(ctx, request).await;
        }

        let request_id = http
            .header(&opts.request_id_header)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| record::fallback_request_id(started_at));

        let span = info_span!(
            "access",
            method = %http.method(),
            path = http.path(),
            request_id = %request_id,
        );

        async move {
            let signals =
                TrackingSignals::collect_with_sessions(http, http.peer_ip(), &opts.session_cookies)
                    .with_request_id(&request_id);
            let mut profile = stile_track::parse(&signals);

            let body = if opts.hides_body(http.headers()) {
                IGNORED_BODY.to_string()
            } else {
                to_json(&request)
            };

            let result = self.inner.handle(ctx, request).await;
            let elapsed = start.elapsed();

            let response = match &result {
                Ok(reply) => Response {
                    status: 200,
                    header: BTreeMap::new(),
                    body: to_json(reply),
                },
                Err(err) => Response {
                    status: err.status(),
                    header: BTreeMap::new(),
                    body: to_json(err),
                },
            };

            if let Some(user) = ctx.user() {
                profile.set_user(user.user_id, user.username, user.node_id);
            }

            let mut access = AccessRecord::new(started_at, request_id);
            access.server_id = opts.server_id.clone();
            access.server_port = opts.server_port.clone();
            access.request = Request {
                method: http.method().to_string(),
                path: http.path().to_string(),
                uri: http.uri().to_string(),
                header: record::flatten_headers(http.headers()),
                body,
            };
            access.response = response;
            access.set_latency(elapsed);
            access.profile = profile;
            let access = Arc::new(access);

            if let Some(ref logger) = opts.request_logger {
                logger.log(Arc::clone(&access));
            }
            if opts.debug {
                opts.logger.log(Level::Debug, &access.to_json_line());
            }

            result
        }
        .instrument(span)
        .await
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
