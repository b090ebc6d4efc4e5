//! Request and response interceptors run around every dispatched call.
//!
//! - [`RequestInterceptor`] attaches the bearer credential and strips the JSON
//!   content type from multipart uploads.
//! - [`ResponseInterceptor`] turns a 401 into session teardown plus a single
//!   [`SessionEvent::Expired`] signal, and surfaces every other failure as-is.
//!
//! Neither interceptor retries, and neither holds per-call state.

use std::sync::Arc;

use common::protocol::ErrorBody;
use common::{SessionEvent, TransportError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::context::{Credential, RequestContext};
use crate::session::SessionStore;

/// Runs before every call.
#[derive(Clone)]
pub struct RequestInterceptor {
    store: Arc<dyn SessionStore>,
}

impl RequestInterceptor {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Adjust `headers` for the call described by `ctx`.
    ///
    /// A failing session store read is logged and the call proceeds without
    /// a credential.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the token cannot be
    /// encoded as a header value.
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
    ) -> Result<(), TransportError> {
        let token = match &ctx.credential {
            Credential::Explicit(token) => Some(token.clone()),
            Credential::Session => match self.store.get_token().await {
                Ok(token) => token,
                Err(e) => {
                    warn!(request_id = %ctx.request_id, error = %e, "session read failed; sending without credential");
                    None
                }
            },
        };

        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    TransportError::InvalidRequest("token is not a valid header value".into())
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                headers.remove(AUTHORIZATION);
            }
        }

        if ctx.is_multipart() {
            // The transport writes its own `multipart/form-data; boundary=...`.
            headers.remove(CONTENT_TYPE);
        }
        Ok(())
    }
}

/// Runs after every response or transport failure.
#[derive(Clone)]
pub struct ResponseInterceptor {
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl ResponseInterceptor {
    pub fn new(store: Arc<dyn SessionStore>, events: broadcast::Sender<SessionEvent>) -> Self {
        Self { store, events }
    }

    /// Pass 2xx responses through; map everything else.
    ///
    /// With `pass_redirects` set, an unfollowed 3xx is also handed back so a
    /// raw passthrough call can read its `Location`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::SessionExpired`] on 401, after the store is cleared.
    /// - [`TransportError::Upstream`] on any other non-2xx status.
    pub async fn inspect(
        &self,
        response: Response,
        pass_redirects: bool,
    ) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() || (pass_redirects && status.is_redirection()) {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.expire().await;
            return Err(TransportError::SessionExpired);
        }

        let detail = match response.bytes().await {
            Ok(raw) => ErrorBody::detail_from(&raw),
            Err(e) => {
                debug!(error = %e, "error body unreadable");
                None
            }
        };
        Err(TransportError::Upstream {
            status: status.as_u16(),
            detail,
        })
    }

    /// Map a call that produced no response.
    pub fn on_transport_failure(&self, err: reqwest::Error) -> TransportError {
        TransportError::Network(err.to_string())
    }

    async fn expire(&self) {
        if let Err(e) = self.store.clear_token().await {
            warn!(error = %e, "failed to clear expired session");
        }
        // No subscribers is fine; the caller still receives the error.
        let _ = self.events.send(SessionEvent::Expired);
        warn!("session expired; stored token cleared");
    }
}
