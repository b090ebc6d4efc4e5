use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Arguments for the `stx` CLI.
///
/// Backend and passphrase come from `STX_*` environment variables.
#[derive(Parser, Debug)]
#[command(version, about = "Encrypted-envelope transport client")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seal a JSON document into an envelope ciphertext.
    Seal {
        #[clap(help = "JSON document, e.g. '{\"username\":\"ali\"}'")]
        json: String,
    },

    /// Open an envelope ciphertext and print the JSON inside.
    Open {
        #[clap(help = "Ciphertext produced by `stx seal` or the backend")]
        ciphertext: String,
    },

    /// Sign in and store the session token.
    SignIn {
        #[clap(long)]
        email: String,

        #[clap(long, env = "STX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session.
    SignOut,

    /// Fetch the signed-in user's profile.
    Profile,

    /// Confirm an email address with the token from a verification link.
    VerifyEmail {
        #[clap(long)]
        token: String,
    },

    /// Upload a certificate file with sealed metadata.
    UploadCertificate {
        #[clap(long, value_name = "PATH")]
        file: PathBuf,

        #[clap(long, value_name = "JSON", default_value = "{}", help = "Certificate metadata")]
        fields: String,

        #[clap(long, value_name = "MIME")]
        mime: Option<String>,
    },
}
