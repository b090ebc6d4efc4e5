//! [`TransportClient`]: base-URL HTTP client wrapped in the interceptor chain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::protocol::MULTIPART_DATA_FIELD;
use common::{SessionEvent, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Response, Url};
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, Instrument};

use super::context::{FilePart, RequestBody, RequestContext};
use super::interceptor::{RequestInterceptor, ResponseInterceptor};
use crate::session::SessionStore;

/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Static settings for a [`TransportClient`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Backend root, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    /// Overall per-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl TransportSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: format!("secure-transport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client bound to one backend, with default headers and interceptors.
///
/// Cheap to clone; clones share the connection pool and session store.
#[derive(Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    base_url: Arc<Url>,
    default_headers: HeaderMap,
    request: RequestInterceptor,
    response: ResponseInterceptor,
}

impl TransportClient {
    /// Build a client for `settings`.
    ///
    /// Redirects are not followed. A 3xx fails the call unless the request
    /// context opts into redirect passthrough (OAuth hands back `Location`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the base URL or user agent
    /// is invalid, or [`TransportError::Network`] if the HTTP stack cannot be
    /// initialised.
    pub fn new(
        settings: &TransportSettings,
        store: Arc<dyn SessionStore>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("base url: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidRequest(format!(
                "base url scheme must be http or https, got {}",
                base_url.scheme()
            )));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|_| TransportError::InvalidRequest("user agent".into()))?,
        );

        let mut builder = reqwest::Client::builder().redirect(redirect::Policy::none());
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            default_headers,
            request: RequestInterceptor::new(store.clone()),
            response: ResponseInterceptor::new(store, events),
        })
    }

    /// Backend root every path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` under the base URL, keeping any base path prefix.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::InvalidRequest(format!("{path}: {e}")))
    }

    /// Dispatch one call through the interceptor chain.
    ///
    /// Runs to completion or failure; never retries.
    pub async fn dispatch(&self, ctx: RequestContext) -> Result<Response, TransportError> {
        let span = info_span!(
            "dispatch",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
        );
        self.dispatch_inner(ctx).instrument(span).await
    }

    async fn dispatch_inner(&self, ctx: RequestContext) -> Result<Response, TransportError> {
        let url = self.url_for(&ctx.path)?;
        let pass_redirects = ctx.pass_redirects;

        let mut headers = self.default_headers.clone();
        self.request.apply(&ctx, &mut headers).await?;
        let request_id = HeaderValue::from_str(&ctx.request_id.to_string())
            .map_err(|_| TransportError::InvalidRequest("request id".into()))?;
        headers.insert(REQUEST_ID_HEADER, request_id);

        let builder = self.http.request(ctx.method.clone(), url).headers(headers);
        let builder = match ctx.body {
            RequestBody::Empty => builder,
            RequestBody::Envelope(envelope) => {
                let body = serde_json::to_vec(&envelope)
                    .map_err(|e| TransportError::Encryption(e.to_string()))?;
                builder.body(body)
            }
            RequestBody::Multipart {
                sealed_fields,
                files,
            } => builder.multipart(build_form(sealed_fields, files)?),
        };

        debug!("request dispatched");
        let started = Instant::now();
        let outcome = builder.send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                info!(status = response.status().as_u16(), elapsed_ms, "response received");
                self.response.inspect(response, pass_redirects).await
            }
            Err(e) => {
                info!(elapsed_ms, error = %e, "no response received");
                Err(self.response.on_transport_failure(e))
            }
        }
    }
}

fn build_form(sealed_fields: String, files: Vec<FilePart>) -> Result<Form, TransportError> {
    let mut form = Form::new().text(MULTIPART_DATA_FIELD, sealed_fields);
    for file in files {
        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        if let Some(mime) = file.mime {
            part = part
                .mime_str(&mime)
                .map_err(|_| TransportError::InvalidRequest(format!("invalid mime type {mime}")))?;
        }
        form = form.part(file.field, part);
    }
    Ok(form)
}
