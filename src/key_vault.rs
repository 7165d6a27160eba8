//! Provisioning of the key vault collection.

use std::path::Path;

use mongodb::{
    bson::{Bson, Document},
    options::{CollectionOptions, ReadConcern, WriteConcern},
    Client,
    Collection,
    Namespace,
};

use crate::{
    error::{Error, Result, SetupStep},
    trace::{TracingRepresentation, PROVISION_TRACING_EVENT_TARGET},
};

/// Database holding the key vault.
pub const KEY_VAULT_DATABASE: &str = "keyvault";
/// Collection holding the wrapped data keys.
pub const KEY_VAULT_COLLECTION: &str = "datakeys";

/// The `keyvault.datakeys` namespace.
pub fn key_vault_namespace() -> Namespace {
    Namespace::new(KEY_VAULT_DATABASE, KEY_VAULT_COLLECTION)
}

/// A handle to the key vault collection using majority read and write concerns, so that seeded
/// keys are durable and visible to key lookups as soon as a write returns.
pub fn datakeys(client: &Client) -> Collection<Document> {
    client
        .database(KEY_VAULT_DATABASE)
        .collection_with_options(
            KEY_VAULT_COLLECTION,
            CollectionOptions::builder()
                .read_concern(ReadConcern::majority())
                .write_concern(WriteConcern::majority())
                .build(),
        )
}

/// Drops the key vault and, if `seed` is non-empty, inserts exactly those documents.
///
/// The seed documents are stored verbatim. An empty seed leaves the key vault absent, which is
/// a valid starting state for tests that create their keys from scratch.
pub async fn reset(client: &Client, seed: &[Document]) -> Result<()> {
    let datakeys = datakeys(client);

    datakeys
        .drop()
        .await
        .map_err(|e| Error::setup(SetupStep::DropKeyVault, e))?;
    tracing::debug!(
        target: PROVISION_TRACING_EVENT_TARGET,
        namespace = %key_vault_namespace(),
        "Dropped key vault"
    );

    if seed.is_empty() {
        return Ok(());
    }

    let result = datakeys
        .insert_many(seed)
        .await
        .map_err(|e| Error::setup(SetupStep::SeedKeyVault, e))?;
    tracing::debug!(
        target: PROVISION_TRACING_EVENT_TARGET,
        namespace = %key_vault_namespace(),
        inserted = result.inserted_ids.len(),
        "Seeded key vault"
    );
    for document in seed {
        tracing::trace!(
            target: PROVISION_TRACING_EVENT_TARGET,
            document = document.tracing_representation(),
            "Seed document"
        );
    }

    Ok(())
}

/// Reads key vault documents from an extended JSON file. The file may contain a single document
/// or an array of documents.
pub async fn load_key_vault_documents(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_key_vault_documents(&text)
}

/// Parses key vault documents from extended JSON text. The text may contain a single document
/// or an array of documents.
pub fn parse_key_vault_documents(text: &str) -> Result<Vec<Document>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    match Bson::from(json) {
        Bson::Document(document) => Ok(vec![document]),
        Bson::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Bson::Document(document) => Ok(document),
                other => Err(Error::invalid_argument(format!(
                    "expected a key vault document, got {other}"
                ))),
            })
            .collect(),
        other => Err(Error::invalid_argument(format!(
            "expected a key vault document or an array of them, got {other}"
        ))),
    }
}
