//! End-to-end tests: the real client against an in-process backend that
//! speaks the sealed-envelope protocol.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use secure_transport::client::TransportSettings;
use secure_transport::domain::SignInRequest;
use secure_transport::session::SessionStoreError;
use secure_transport::{
    Credential, EnvelopeCodec, FilePart, FileSessionStore, MemorySessionStore, SecureClient, SecureEnvelope,
    SessionEvent, SessionStore, TransportError,
};

const PASSPHRASE: &str = "jobs-portal-shared-secret";
const GOOD_TOKEN: &str = "tok-123";
const MOVED_TOKEN: &str = "tok-moved";

/// What the backend saw for one request.
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    authorization: Option<String>,
    content_type: Option<String>,
}

#[derive(Clone)]
struct Backend {
    codec: EnvelopeCodec,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Backend {
    fn record(&self, path: &str, headers: &HeaderMap) {
        let get = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
                .map(str::to_owned)
        };
        self.seen.lock().unwrap().push(Seen {
            path: path.to_owned(),
            authorization: get(header::AUTHORIZATION),
            content_type: get(header::CONTENT_TYPE),
        });
    }

    fn sealed(&self, value: Value) -> Response {
        Json(self.codec.seal_envelope(&value).unwrap()).into_response()
    }

    fn open(&self, env: &SecureEnvelope) -> Value {
        serde_json::from_str(&self.codec.decode(&env.data).unwrap()).unwrap()
    }
}

async fn sign_in(State(b): State<Backend>, headers: HeaderMap, Json(env): Json<SecureEnvelope>) -> Response {
    b.record("/auth/signin", &headers);
    let body = b.open(&env);
    match (body["email"].as_str(), body["password"].as_str()) {
        (Some("ali@example.com"), Some("good")) => b.sealed(json!({
            "user": {"id": 7, "username": "ali"},
            "token": GOOD_TOKEN
        })),
        (Some("tokenless@example.com"), _) => b.sealed(json!({"user": {"id": 8}})),
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"message": "invalid credentials"})),
        )
            .into_response(),
    }
}

async fn profile(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("/user/profile", &headers);
    let expected = format!("Bearer {GOOD_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(auth) if auth == expected => {
            b.sealed(json!({"user": {"username": "ali", "phone": "0300"}}))
        }
        Some(auth) if auth == format!("Bearer {MOVED_TOKEN}") => (
            StatusCode::FOUND,
            [(header::LOCATION, "https://elsewhere.example.com/")],
        )
            .into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "jwt expired"}))).into_response(),
    }
}

async fn update_profile(
    State(b): State<Backend>,
    headers: HeaderMap,
    Json(env): Json<SecureEnvelope>,
) -> Response {
    b.record("/user/profile", &headers);
    let fields = b.open(&env);
    b.sealed(json!({"user": fields}))
}

async fn verify_email(
    State(b): State<Backend>,
    headers: HeaderMap,
    Json(env): Json<SecureEnvelope>,
) -> Response {
    b.record("/auth/verify-email", &headers);
    assert_eq!(b.open(&env), json!({}));
    b.sealed(json!({"verified": true}))
}

async fn certificates(State(b): State<Backend>, headers: HeaderMap, mut form: Multipart) -> Response {
    b.record("/user/certificates", &headers);
    let mut fields = Value::Null;
    let mut file_name = None;
    let mut file_len = 0usize;
    while let Some(field) = form.next_field().await.unwrap() {
        match field.name() {
            Some("data") => {
                let text = field.text().await.unwrap();
                fields = serde_json::from_str(&b.codec.decode(&text).unwrap()).unwrap();
            }
            Some("certificate") => {
                file_name = field.file_name().map(str::to_owned);
                file_len = field.bytes().await.unwrap().len();
            }
            _ => {}
        }
    }
    b.sealed(json!({"fields": fields, "file_name": file_name, "file_len": file_len}))
}

async fn garbage(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("/garbage", &headers);
    Json(json!({"data": "U2FsdGVkX1+not-ours"})).into_response()
}

async fn plain(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("/plain", &headers);
    Json(json!({"user": {"id": 1}})).into_response()
}

async fn conflict(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("/auth/signup", &headers);
    (
        StatusCode::CONFLICT,
        Json(json!({"message": "email already registered"})),
    )
        .into_response()
}

async fn oauth(State(b): State<Backend>, headers: HeaderMap) -> Response {
    b.record("/auth/google", &headers);
    (
        StatusCode::FOUND,
        [(header::LOCATION, "https://accounts.example.com/o/oauth2/auth")],
    )
        .into_response()
}

/// Test server instance that runs in the background.
struct TestServer {
    addr: SocketAddr,
    backend: Backend,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = Backend {
            codec: EnvelopeCodec::new(PASSPHRASE).unwrap(),
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/api/auth/signin", post(sign_in))
            .route("/api/auth/signup", post(conflict))
            .route("/api/auth/verify-email", post(verify_email))
            .route("/api/auth/google", get(oauth))
            .route("/api/user/profile", get(profile).put(update_profile))
            .route("/api/user/certificates", post(certificates))
            .route("/api/garbage", get(garbage))
            .route("/api/plain", get(plain))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        TestServer {
            addr,
            backend,
            handle,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    fn client(&self, store: Arc<dyn SessionStore>) -> SecureClient {
        SecureClient::new(
            &TransportSettings::new(self.base_url()),
            EnvelopeCodec::new(PASSPHRASE).unwrap(),
            store,
        )
        .unwrap()
    }

    fn seen(&self) -> Vec<Seen> {
        self.backend.seen.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Memory store that counts clears.
#[derive(Default)]
struct CountingStore {
    inner: MemorySessionStore,
    clears: AtomicUsize,
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get_token(&self) -> Result<Option<String>, SessionStoreError> {
        self.inner.get_token().await
    }
    async fn set_token(&self, token: &str) -> Result<(), SessionStoreError> {
        self.inner.set_token(token).await
    }
    async fn clear_token(&self) -> Result<(), SessionStoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear_token().await
    }
}

fn good_credentials() -> SignInRequest {
    SignInRequest {
        email: "ali@example.com".into(),
        password: "good".into(),
    }
}

#[tokio::test]
async fn sign_in_stores_token_and_profile_uses_it() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemorySessionStore::new());
    let client = server.client(store.clone());
    let mut events = client.subscribe();

    let result = client.sign_in(&good_credentials()).await.unwrap();
    assert_eq!(result.token, GOOD_TOKEN);
    assert_eq!(result.user["username"], "ali");
    assert_eq!(store.get_token().await.unwrap().as_deref(), Some(GOOD_TOKEN));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn);

    let profile = client.get_profile().await.unwrap();
    assert_eq!(
        Value::Object(profile.user),
        json!({"username": "ali", "phone": "0300"})
    );

    let seen = server.seen();
    assert_eq!(seen[0].path, "/auth/signin");
    assert_eq!(seen[0].authorization, None);
    assert_eq!(seen[1].path, "/user/profile");
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn json_calls_carry_json_content_type() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    client.sign_in(&good_credentials()).await.unwrap();
    assert_eq!(
        server.seen()[0].content_type.as_deref(),
        Some("application/json")
    );
}

#[tokio::test]
async fn profile_401_clears_session_once_and_signals() {
    let server = TestServer::spawn().await;
    let store = Arc::new(CountingStore::default());
    store.set_token("revoked-token").await.unwrap();
    let client = server.client(store.clone());
    let mut events = client.subscribe();

    let err = client.get_profile().await.unwrap_err();
    assert!(matches!(err, TransportError::SessionExpired), "got {err:?}");
    assert_eq!(store.get_token().await.unwrap(), None);
    assert_eq!(store.clears.load(Ordering::SeqCst), 1);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Expired);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn profile_401_clears_durable_session() {
    let server = TestServer::spawn().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session");
    let store = FileSessionStore::open(&path).await.unwrap();
    store.set_token("revoked-token").await.unwrap();
    let client = server.client(Arc::new(store));

    assert!(client.get_profile().await.unwrap_err().is_session_expired());

    let reopened = FileSessionStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_token().await.unwrap(), None);
}

#[tokio::test]
async fn sign_in_without_token_is_contract_violation() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemorySessionStore::new());
    let client = server.client(store.clone());

    let err = client
        .sign_in(&SignInRequest {
            email: "tokenless@example.com".into(),
            password: "whatever".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::ContractViolation(_)), "got {err:?}");
    assert_eq!(store.get_token().await.unwrap(), None);
}

#[tokio::test]
async fn rejected_credentials_surface_upstream_detail() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    let err = client
        .sign_in(&SignInRequest {
            email: "ali@example.com".into(),
            password: "bad".into(),
        })
        .await
        .unwrap_err();
    match err {
        TransportError::Upstream { status, detail } => {
            assert_eq!(status, 422);
            assert_eq!(detail.as_deref(), Some("invalid credentials"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sign_up_conflict_is_upstream_error() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    let err = client
        .sign_up(&json!({"username": "ali", "phone": "0300"}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Upstream { status: 409, .. }));
}

#[tokio::test]
async fn verify_email_uses_link_token_not_session() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemorySessionStore::with_token("session-token"));
    let client = server.client(store.clone());

    let out = client.verify_email("link-token").await.unwrap();
    assert_eq!(out, json!({"verified": true}));
    assert_eq!(
        server.seen()[0].authorization.as_deref(),
        Some("Bearer link-token")
    );
    assert_eq!(
        store.get_token().await.unwrap().as_deref(),
        Some("session-token")
    );
}

#[tokio::test]
async fn update_profile_round_trips_sealed_fields() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::with_token(GOOD_TOKEN)));
    let updated = client
        .update_profile(&json!({"username": "ali", "city": "Lahore"}))
        .await
        .unwrap();
    assert_eq!(updated.user["city"], "Lahore");
}

#[tokio::test]
async fn certificate_upload_is_multipart_with_sealed_fields() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::with_token(GOOD_TOKEN)));

    let file = FilePart::new("certificate", "aws.pdf", b"%PDF-1.7 fake".to_vec())
        .with_mime("application/pdf");
    let out = client
        .upload_certificate(&json!({"title": "AWS SAA", "issuer": "Amazon"}), file)
        .await
        .unwrap();

    assert_eq!(out["fields"], json!({"title": "AWS SAA", "issuer": "Amazon"}));
    assert_eq!(out["file_name"], "aws.pdf");
    assert_eq!(out["file_len"], 13);

    let seen = &server.seen()[0];
    let content_type = seen.content_type.as_deref().unwrap();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "got {content_type}"
    );
    assert!(!content_type.contains("application/json"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn foreign_ciphertext_is_decryption_error() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    let err = client
        .call::<(), Value>(reqwest::Method::GET, "/garbage", None, Credential::Session)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Decryption(_)), "got {err:?}");
}

#[tokio::test]
async fn unenveloped_body_is_contract_violation() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    let err = client
        .call::<(), Value>(reqwest::Method::GET, "/plain", None, Credential::Session)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::ContractViolation(_)), "got {err:?}");
}

#[tokio::test]
async fn passphrase_mismatch_is_decryption_error() {
    let server = TestServer::spawn().await;
    let client = SecureClient::new(
        &TransportSettings::new(server.base_url()),
        EnvelopeCodec::new("wrong-passphrase").unwrap(),
        Arc::new(MemorySessionStore::with_token(GOOD_TOKEN)),
    )
    .unwrap();
    let err = client.get_profile().await.unwrap_err();
    assert!(matches!(err, TransportError::Decryption(_)), "got {err:?}");
}

#[tokio::test]
async fn oauth_redirect_is_raw_passthrough() {
    let server = TestServer::spawn().await;
    let client = server.client(Arc::new(MemorySessionStore::new()));
    let raw = client.oauth_redirect("google").await.unwrap();
    assert_eq!(raw.status.as_u16(), 302);
    assert_eq!(
        raw.location(),
        Some("https://accounts.example.com/o/oauth2/auth")
    );
}

#[tokio::test]
async fn redirect_on_enveloped_call_is_upstream_error() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemorySessionStore::with_token(MOVED_TOKEN));
    let client = server.client(store.clone());

    let err = client.get_profile().await.unwrap_err();
    assert!(
        matches!(err, TransportError::Upstream { status: 302, .. }),
        "got {err:?}"
    );
    assert_eq!(store.get_token().await.unwrap().as_deref(), Some(MOVED_TOKEN));
}

#[tokio::test]
async fn logout_clears_and_signals() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemorySessionStore::new());
    let client = server.client(store.clone());
    client.sign_in(&good_credentials()).await.unwrap();
    let mut events = client.subscribe();

    client.logout().await.unwrap();
    assert_eq!(store.get_token().await.unwrap(), None);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);

    assert!(client.get_profile().await.unwrap_err().is_session_expired());
}
