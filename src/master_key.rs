//! Master key material used to wrap data keys in tests.

use std::sync::{Arc, LazyLock};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use mongodb::{
    bson::{doc, spec::BinarySubtype, Binary, Document},
    mongocrypt::ctx::KmsProvider,
    options::TlsOptions,
};

use crate::{
    env::{self, Environment},
    error::Result,
};

/// The local master key shared by the cross-driver encryption test suites, base64-encoded.
pub const LOCAL_MASTER_KEY_BASE64: &str = "Mng0NCt4ZHVUYUJCa1kxNkVyNUR1QURhZ2h2UzR2d2RrZzh0cFBwM3R6NmdWMDFBMUN3YkQ5aXRRMkhGRGdQV09wOGVNYUMxT2k3NjZKelhaQmRCZGJkTXVyZG9uSjFk";

/// Length in bytes of a local master key.
pub const LOCAL_MASTER_KEY_LEN: usize = 96;

static LOCAL_MASTER_KEY: LazyLock<Vec<u8>> = LazyLock::new(|| {
    STANDARD
        .decode(LOCAL_MASTER_KEY_BASE64)
        .expect("LOCAL_MASTER_KEY_BASE64 is valid base64")
});

/// The decoded local master key. The same bytes are returned for every call in every process.
pub fn local_master_key() -> &'static [u8] {
    &LOCAL_MASTER_KEY
}

/// A KMS provider configuration in the form accepted by
/// [`ClientEncryption::new`](mongodb::client_encryption::ClientEncryption::new) and
/// [`Client::encrypted_builder`](mongodb::Client::encrypted_builder).
pub type KmsProviderConfig = (KmsProvider, Document, Option<TlsOptions>);

/// Credentials for the AWS KMS provider. Both values are opaque to the harness.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// The AWS access key id.
    pub access_key_id: String,

    /// The AWS secret access key.
    pub secret_access_key: String,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Supplies master key material to tests.
#[derive(Clone, Debug)]
pub struct MasterKeyProvider {
    env: Arc<dyn Environment>,
    local_key: Vec<u8>,
}

impl MasterKeyProvider {
    /// Creates a provider that uses the shared local master key and reads KMS credentials from
    /// `env`.
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            local_key: local_master_key().to_vec(),
        }
    }

    /// Replaces the local master key with an alternate vector.
    pub fn with_local_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.local_key = key.into();
        self
    }

    /// The local master key.
    pub fn local_key(&self) -> &[u8] {
        &self.local_key
    }

    /// Reads the AWS credentials. If either variable is undefined, returns a skip error naming
    /// the first one that is missing.
    pub fn kms_credentials(&self) -> Result<AwsCredentials> {
        Ok(AwsCredentials {
            access_key_id: self.env.require(env::AWS_ACCESS_KEY_ID)?,
            secret_access_key: self.env.require(env::AWS_SECRET_ACCESS_KEY)?,
        })
    }

    /// The local KMS provider configured with the local master key.
    pub fn local_kms_provider(&self) -> KmsProviderConfig {
        let key = Binary {
            subtype: BinarySubtype::Generic,
            bytes: self.local_key.clone(),
        };
        (KmsProvider::local(), doc! { "key": key }, None)
    }

    /// The AWS KMS provider configured with the credentials from the environment.
    pub fn aws_kms_provider(&self) -> Result<KmsProviderConfig> {
        let credentials = self.kms_credentials()?;
        Ok((
            KmsProvider::aws(),
            doc! {
                "accessKeyId": credentials.access_key_id,
                "secretAccessKey": credentials.secret_access_key,
            },
            None,
        ))
    }
}
