//! Per-call request description handed to the interceptor chain.

use std::fmt;

use bytes::Bytes;
use common::SecureEnvelope;
use reqwest::Method;
use uuid::Uuid;

/// Where the bearer credential for a call comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Read the token from the session store at dispatch time.
    Session,
    /// Use this one-off token instead of the stored session
    /// (e.g. the token carried by an email-verification link).
    Explicit(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Session => f.write_str("Session"),
            Credential::Explicit(_) => f.write_str("Explicit([REDACTED])"),
        }
    }
}

/// A binary part of a multipart upload. Sent as-is, never sealed.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Multipart field name the backend expects.
    pub field: String,
    pub file_name: String,
    /// MIME type, e.g. `application/pdf`. `None` lets the transport default it.
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Body of a dispatched call.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body (plain `GET`s and raw passthrough calls).
    Empty,
    /// Whole-body sealed envelope sent as JSON.
    Envelope(SecureEnvelope),
    /// Sealed non-file fields plus raw file parts.
    Multipart {
        sealed_fields: String,
        files: Vec<FilePart>,
    },
}

/// Everything the transport needs to dispatch one call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path relative to the configured base URL.
    pub path: String,
    pub body: RequestBody,
    pub credential: Credential,
    /// Correlates log lines and is sent as `X-Request-Id`.
    pub request_id: Uuid,
    /// Hand 3xx responses back to the caller instead of failing the call.
    /// Only raw passthrough calls set this.
    pub pass_redirects: bool,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            credential: Credential::Session,
            request_id: Uuid::new_v4(),
            pass_redirects: false,
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_redirect_passthrough(mut self) -> Self {
        self.pass_redirects = true;
        self
    }

    /// Whether the body is multipart, which drops the JSON content type.
    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart { .. })
    }
}
