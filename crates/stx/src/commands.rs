//! Subcommand execution. Each command prints its result as JSON on stdout.

use anyhow::{Context, Result};
use secure_transport::domain::SignInRequest;
use secure_transport::{Config, EnvelopeCodec, FilePart, SecureClient};
use serde_json::{json, Value};
use tracing::info;

use crate::args::Command;

/// Run `command` and return the JSON to print.
pub async fn run(command: Command, cfg: &Config) -> Result<Value> {
    match command {
        Command::Seal { json } => {
            let value: Value = serde_json::from_str(&json).context("argument is not valid JSON")?;
            let codec = EnvelopeCodec::new(&cfg.envelope_passphrase)?;
            Ok(json!({ "data": codec.encode(&value)? }))
        }
        Command::Open { ciphertext } => {
            let codec = EnvelopeCodec::new(&cfg.envelope_passphrase)?;
            let text = codec.decode(&ciphertext)?;
            serde_json::from_str(&text).context("envelope does not contain JSON")
        }
        Command::SignIn { email, password } => {
            let client = cfg.build_client().await?;
            let result = client.sign_in(&SignInRequest { email, password }).await?;
            Ok(json!({ "user": result.user }))
        }
        Command::SignOut => {
            let client = cfg.build_client().await?;
            client.logout().await?;
            Ok(json!({ "signed_out": true }))
        }
        Command::Profile => {
            let client = cfg.build_client().await?;
            let profile = client.get_profile().await?;
            Ok(json!({ "user": profile.user }))
        }
        Command::VerifyEmail { token } => {
            let client = cfg.build_client().await?;
            Ok(client.verify_email(&token).await?)
        }
        Command::UploadCertificate { file, fields, mime } => {
            let client = cfg.build_client().await?;
            upload_certificate(&client, &file, &fields, mime).await
        }
    }
}

async fn upload_certificate(
    client: &SecureClient,
    path: &std::path::Path,
    fields: &str,
    mime: Option<String>,
) -> Result<Value> {
    let fields: Value = serde_json::from_str(fields).context("--fields is not valid JSON")?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?
        .to_owned();

    info!(file_name = %file_name, size = bytes.len(), "uploading certificate");
    let mut part = FilePart::new("certificate", file_name, bytes);
    if let Some(mime) = mime {
        part = part.with_mime(mime);
    }
    Ok(client.upload_certificate(&fields, part).await?)
}
