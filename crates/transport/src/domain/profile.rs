//! Profile endpoints, including the multipart certificate upload.

use common::TransportError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::call::{Contract, SecureClient};
use crate::client::{Credential, FilePart};

pub const PROFILE_PATH: &str = "/user/profile";
pub const CERTIFICATES_PATH: &str = "/user/certificates";

/// Decoded profile response; the `user` object is required.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResult {
    pub user: Map<String, Value>,
}

impl Contract for ProfileResult {
    fn check(&self) -> Result<(), String> {
        if self.user.is_empty() {
            return Err("profile response carries an empty user record".into());
        }
        Ok(())
    }
}

impl SecureClient {
    /// Fetch the signed-in user's profile.
    #[instrument(skip_all)]
    pub async fn get_profile(&self) -> Result<ProfileResult, TransportError> {
        self.call(Method::GET, PROFILE_PATH, None::<&()>, Credential::Session)
            .await
    }

    /// Replace profile fields. The field set is owned by the caller.
    #[instrument(skip_all)]
    pub async fn update_profile<P: Serialize + ?Sized>(
        &self,
        fields: &P,
    ) -> Result<ProfileResult, TransportError> {
        self.call(Method::PUT, PROFILE_PATH, Some(fields), Credential::Session)
            .await
    }

    /// Upload a certificate file; `fields` (title, issuer, ...) are sealed,
    /// the file bytes are sent as-is.
    #[instrument(skip_all, fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload_certificate<P: Serialize + ?Sized>(
        &self,
        fields: &P,
        file: FilePart,
    ) -> Result<Value, TransportError> {
        self.call_multipart(CERTIFICATES_PATH, fields, vec![file], Credential::Session)
            .await
    }
}
