//! [`SecureClient`]: the encode → dispatch → decode → check sequence every
//! business endpoint follows.

use std::sync::Arc;

use bytes::Bytes;
use common::{SecureEnvelope, SessionEvent, TransportError};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::client::{
    Credential, FilePart, RequestBody, RequestContext, TransportClient, TransportSettings,
};
use crate::crypto::EnvelopeCodec;
use crate::session::SessionStore;

/// Capacity of the session event channel. Slow subscribers lag, they never block calls.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Structural check run on a decoded response before it is handed back.
///
/// A failed check turns a 2xx into [`TransportError::ContractViolation`].
pub trait Contract: DeserializeOwned {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Contract for serde_json::Value {}

/// Unencrypted response from a passthrough endpoint.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// `Location` header of a redirect, if present and printable.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Entry point for domain calls: codec, transport, and session in one value.
///
/// Construct once and clone wherever calls are made; clones share the
/// session store, connection pool, and event channel.
#[derive(Clone)]
pub struct SecureClient {
    transport: TransportClient,
    codec: EnvelopeCodec,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SecureClient {
    /// Assemble a client from its parts.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportClient::new`] failures.
    pub fn new(
        settings: &TransportSettings,
        codec: EnvelopeCodec,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, TransportError> {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let transport = TransportClient::new(settings, store.clone(), events.clone())?;
        Ok(Self {
            transport,
            codec,
            store,
            events,
        })
    }

    /// Subscribe to session lifecycle signals (`Expired`, `SignedIn`, `SignedOut`).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    /// Seal `payload` (if any), dispatch, then open and check the response.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]; nothing is retried or swallowed.
    pub async fn call<P, R>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&P>,
        credential: Credential,
    ) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: Contract,
    {
        let body = match payload {
            Some(payload) => RequestBody::Envelope(self.codec.seal_envelope(payload)?),
            None => RequestBody::Empty,
        };
        let ctx = RequestContext::new(method, path)
            .with_body(body)
            .with_credential(credential);
        let response = self.transport.dispatch(ctx).await?;
        self.open_response(response).await
    }

    /// Multipart variant: `fields` are sealed into the `data` part, `files`
    /// travel as raw parts.
    pub async fn call_multipart<P, R>(
        &self,
        path: &str,
        fields: &P,
        files: Vec<FilePart>,
        credential: Credential,
    ) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: Contract,
    {
        let ctx = RequestContext::new(Method::POST, path)
            .with_body(RequestBody::Multipart {
                sealed_fields: self.codec.encode(fields)?,
                files,
            })
            .with_credential(credential);
        let response = self.transport.dispatch(ctx).await?;
        self.open_response(response).await
    }

    /// Dispatch without any envelope in either direction.
    ///
    /// Only for endpoints that never carry user or business data. An
    /// unfollowed 3xx is returned as a [`RawResponse`] rather than an error.
    pub async fn call_raw(
        &self,
        method: Method,
        path: &str,
        credential: Credential,
    ) -> Result<RawResponse, TransportError> {
        let ctx = RequestContext::new(method, path)
            .with_credential(credential)
            .with_redirect_passthrough();
        let response = self.transport.dispatch(ctx).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Persist `token` as the current session and announce it.
    pub async fn start_session(&self, token: &str) -> Result<(), TransportError> {
        self.store
            .set_token(token)
            .await
            .map_err(|e| TransportError::SessionStore(e.to_string()))?;
        let _ = self.events.send(SessionEvent::SignedIn);
        info!("session started");
        Ok(())
    }

    /// Drop the current session locally and announce it.
    pub async fn end_session(&self) -> Result<(), TransportError> {
        self.store.clear_token().await.map_err(|e| {
            warn!(error = %e, "failed to clear session");
            TransportError::SessionStore(e.to_string())
        })?;
        let _ = self.events.send(SessionEvent::SignedOut);
        info!("session ended");
        Ok(())
    }

    /// Whether a usable session token is currently stored.
    ///
    /// An empty token counts as no session, matching the request interceptor.
    pub async fn has_session(&self) -> bool {
        matches!(self.store.get_token().await, Ok(Some(t)) if !t.is_empty())
    }

    async fn open_response<R: Contract>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, TransportError> {
        let raw = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let envelope: SecureEnvelope = serde_json::from_slice(&raw).map_err(|e| {
            TransportError::ContractViolation(format!("response is not an envelope: {e}"))
        })?;
        let decoded: R = self.codec.open_envelope(&envelope)?;
        decoded.check().map_err(TransportError::ContractViolation)?;
        Ok(decoded)
    }
}
