//! Account endpoints: sign-up, sign-in, email verification, password reset,
//! logout, and the OAuth redirect passthrough.

use common::TransportError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::call::{Contract, RawResponse, SecureClient};
use crate::client::Credential;

pub const SIGN_UP_PATH: &str = "/auth/signup";
pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const VERIFY_EMAIL_PATH: &str = "/auth/verify-email";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

/// Sign-in request body (sealed on the wire).
#[derive(Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Decoded sign-in response. Both the user record and the token are required.
#[derive(Clone, Deserialize)]
pub struct SignInResult {
    pub user: Map<String, Value>,
    pub token: String,
}

impl std::fmt::Debug for SignInResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInResult")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Contract for SignInResult {
    fn check(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("sign-in response carries an empty token".into());
        }
        if self.user.is_empty() {
            return Err("sign-in response carries an empty user record".into());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    password: &'a str,
}

impl SecureClient {
    /// Register an account. The registration fields are owned by the caller.
    #[instrument(skip_all)]
    pub async fn sign_up<P: Serialize + ?Sized>(&self, fields: &P) -> Result<Value, TransportError> {
        self.call(Method::POST, SIGN_UP_PATH, Some(fields), Credential::Session)
            .await
    }

    /// Authenticate and, on a well-formed response, store the returned token.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<SignInResult, TransportError> {
        debug!("signing in");
        let result: SignInResult = self
            .call(Method::POST, SIGN_IN_PATH, Some(request), Credential::Session)
            .await?;
        self.start_session(&result.token).await?;
        info!("signed in");
        Ok(result)
    }

    /// Confirm an email address with the token from the verification link.
    ///
    /// The link token is used for this call only; the stored session is
    /// neither read nor changed.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, link_token: &str) -> Result<Value, TransportError> {
        self.call(
            Method::POST,
            VERIFY_EMAIL_PATH,
            Some(&serde_json::json!({})),
            Credential::Explicit(link_token.to_owned()),
        )
        .await
    }

    /// Ask the backend to send a password-reset link.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<Value, TransportError> {
        self.call(
            Method::POST,
            FORGOT_PASSWORD_PATH,
            Some(&ForgotPasswordRequest { email }),
            Credential::Session,
        )
        .await
    }

    /// Set a new password using the token from the reset link.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        link_token: &str,
        new_password: &str,
    ) -> Result<Value, TransportError> {
        self.call(
            Method::POST,
            RESET_PASSWORD_PATH,
            Some(&ResetPasswordRequest {
                password: new_password,
            }),
            Credential::Explicit(link_token.to_owned()),
        )
        .await
    }

    /// Forget the session locally. No backend call is made.
    pub async fn logout(&self) -> Result<(), TransportError> {
        self.end_session().await
    }

    /// Start an OAuth flow with `provider`; the response is never enveloped.
    ///
    /// Returns the raw response so the caller can follow the `Location`.
    #[instrument(skip(self))]
    pub async fn oauth_redirect(&self, provider: &str) -> Result<RawResponse, TransportError> {
        if provider.is_empty() || !provider.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(TransportError::InvalidRequest(format!(
                "unsupported oauth provider {provider:?}"
            )));
        }
        self.call_raw(Method::GET, &format!("/auth/{provider}"), Credential::Session)
            .await
    }
}
