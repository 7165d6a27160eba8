//! Connection settings for provisioning and auto-encrypting clients.

use std::{collections::HashMap, fs::read_to_string, sync::LazyLock};

use home::home_dir;
use mongodb::{
    bson::{doc, Document},
    options::ClientOptions,
    Client,
};
use tokio::sync::OnceCell;
use typed_builder::TypedBuilder;

use crate::{
    env::{crypt_shared_lib_path, Environment},
    error::Result,
    key_vault::key_vault_namespace,
    master_key::KmsProviderConfig,
};

pub(crate) static DEFAULT_URI: LazyLock<String> = LazyLock::new(get_default_uri);

/// The connection string tests connect with: `MONGODB_URI`, else the contents of
/// `~/.mongodb_uri`, else a local server on the default port.
pub fn default_uri() -> &'static str {
    &DEFAULT_URI
}

/// Options parsed from [`default_uri`]. Parsing happens once per process.
pub async fn client_options() -> Result<&'static ClientOptions> {
    static CLIENT_OPTIONS: OnceCell<ClientOptions> = OnceCell::const_new();
    Ok(CLIENT_OPTIONS
        .get_or_try_init(|| async { ClientOptions::parse(&*DEFAULT_URI).await })
        .await?)
}

/// A client without auto encryption, used to provision the key vault and test collections.
pub async fn setup_client() -> Result<Client> {
    Ok(Client::with_options(client_options().await?.clone())?)
}

fn get_default_uri() -> String {
    if let Ok(uri) = std::env::var("MONGODB_URI") {
        return uri;
    }
    if let Some(mut home) = home_dir() {
        home.push(".mongodb_uri");
        if let Ok(uri) = read_to_string(home) {
            return uri.trim().to_string();
        }
    }
    "mongodb://localhost:27017".to_string()
}

/// Extra auto encryption options pointing the driver at the configured `crypt_shared` library,
/// or `None` if `CRYPT_SHARED_LIB_PATH` is not set.
pub fn extra_options(env: &dyn Environment) -> Option<Document> {
    crypt_shared_lib_path(env)
        .map(|path| doc! { "cryptSharedLibPath": path.to_string_lossy().into_owned() })
}

/// Optional auto encryption settings for [`encrypted_client`].
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(strip_option)))]
#[non_exhaustive]
pub struct AutoEncryptionConfig {
    /// Local JSON schemas, keyed by namespace.
    pub schema_map: Option<HashMap<String, Document>>,

    /// Local `encryptedFields` documents, keyed by namespace.
    pub encrypted_fields_map: Option<HashMap<String, Document>>,

    /// Disable automatic encryption while keeping automatic decryption.
    pub bypass_auto_encryption: Option<bool>,

    /// The client used for key vault queries.
    pub key_vault_client: Option<Client>,
}

/// Creates a client with auto encryption enabled against the `keyvault.datakeys` key vault. If
/// `CRYPT_SHARED_LIB_PATH` is set, the driver is pointed at that library.
pub async fn encrypted_client(
    options: ClientOptions,
    kms_providers: impl IntoIterator<Item = KmsProviderConfig>,
    config: AutoEncryptionConfig,
    env: &dyn Environment,
) -> Result<Client> {
    let mut builder = Client::encrypted_builder(options, key_vault_namespace(), kms_providers)?
        .extra_options(extra_options(env))
        .bypass_auto_encryption(config.bypass_auto_encryption)
        .key_vault_client(config.key_vault_client);
    if let Some(schema_map) = config.schema_map {
        builder = builder.schema_map(schema_map);
    }
    if let Some(encrypted_fields_map) = config.encrypted_fields_map {
        builder = builder.encrypted_fields_map(encrypted_fields_map);
    }
    Ok(builder.build().await?)
}
