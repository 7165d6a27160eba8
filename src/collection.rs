//! Provisioning of the application collection under one encryption mode.

use mongodb::{
    bson::{doc, Document},
    options::{CreateCollectionOptions, DropCollectionOptions},
};

use crate::{
    context::TestContext,
    error::{Error, Result, SetupStep},
    trace::{TracingRepresentation, PROVISION_TRACING_EVENT_TARGET},
};

/// How the application collection enforces encryption.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CollectionEncryption {
    /// No encryption configuration.
    #[default]
    Plain,

    /// Queryable encryption: the server enforces encryption of the fields declared in this
    /// `encryptedFields` document.
    EncryptedFields(Document),

    /// Client-side field level encryption: the collection carries a `$jsonSchema` validator
    /// with this schema, whose `encrypt` markers drive automatic encryption.
    JsonSchema(Document),
}

impl CollectionEncryption {
    /// Selects the encryption mode from a pair of optional schemas. Empty documents count as
    /// absent. Supplying both schemas is an error.
    pub fn from_options(
        encrypted_fields: Option<Document>,
        json_schema: Option<Document>,
    ) -> Result<Self> {
        let encrypted_fields = encrypted_fields.filter(|d| !d.is_empty());
        let json_schema = json_schema.filter(|d| !d.is_empty());
        match (encrypted_fields, json_schema) {
            (Some(_), Some(_)) => Err(Error::configuration_ambiguity(
                "both encryptedFields and a $jsonSchema validator were supplied; a collection \
                 uses exactly one encryption mode",
            )),
            (Some(fields), None) => Ok(Self::EncryptedFields(fields)),
            (None, Some(schema)) => Ok(Self::JsonSchema(schema)),
            (None, None) => Ok(Self::Plain),
        }
    }

    /// The `encryptedFields` document, if this is queryable encryption.
    pub fn encrypted_fields(&self) -> Option<&Document> {
        match self {
            Self::EncryptedFields(fields) => Some(fields),
            _ => None,
        }
    }

    /// The `$jsonSchema` validator schema, if this is schema-validated encryption.
    pub fn json_schema(&self) -> Option<&Document> {
        match self {
            Self::JsonSchema(schema) => Some(schema),
            _ => None,
        }
    }

    /// Adds this configuration to collection creation options.
    pub fn apply(&self, options: &mut CreateCollectionOptions) {
        match self {
            Self::Plain => {}
            Self::EncryptedFields(fields) => {
                options.encrypted_fields = Some(fields.clone());
            }
            Self::JsonSchema(schema) => {
                options.validator = Some(doc! { "$jsonSchema": schema.clone() });
            }
        }
    }

    fn mode_name(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::EncryptedFields(_) => "encryptedFields",
            Self::JsonSchema(_) => "$jsonSchema",
        }
    }
}

/// The options the test collection is created with: the context defaults plus the encryption
/// configuration.
pub fn create_options(
    context: &TestContext,
    encryption: &CollectionEncryption,
) -> CreateCollectionOptions {
    let mut options = context.default_create_options();
    encryption.apply(&mut options);
    options
}

/// Creates the test collection with the given encryption configuration.
pub async fn create_collection(
    context: &TestContext,
    encryption: &CollectionEncryption,
) -> Result<()> {
    let options = create_options(context, encryption);
    context
        .database()
        .create_collection(&context.collection_name)
        .with_options(options)
        .await
        .map_err(|e| Error::setup(SetupStep::CreateCollection, e))?;
    tracing::debug!(
        target: PROVISION_TRACING_EVENT_TARGET,
        namespace = %context.namespace(),
        mode = encryption.mode_name(),
        encryptedFields = encryption.encrypted_fields().map(|d| d.tracing_representation()),
        jsonSchema = encryption.json_schema().map(|d| d.tracing_representation()),
        "Created test collection"
    );
    Ok(())
}

/// Creates the test collection from a pair of optional schemas. At most one may be supplied.
pub async fn create_collection_with(
    context: &TestContext,
    encrypted_fields: Option<Document>,
    json_schema: Option<Document>,
) -> Result<()> {
    let encryption = CollectionEncryption::from_options(encrypted_fields, json_schema)?;
    create_collection(context, &encryption).await
}

/// Drops the test collection. For queryable encryption the `encryptedFields` are passed along so
/// that the auxiliary state collections are dropped as well.
pub async fn drop_collection(
    context: &TestContext,
    encryption: &CollectionEncryption,
) -> Result<()> {
    let mut options = DropCollectionOptions::builder()
        .write_concern(context.write_concern.clone())
        .build();
    options.encrypted_fields = encryption.encrypted_fields().cloned();
    context
        .collection()
        .drop()
        .with_options(options)
        .await
        .map_err(|e| Error::setup(SetupStep::DropCollection, e))?;
    tracing::debug!(
        target: PROVISION_TRACING_EVENT_TARGET,
        namespace = %context.namespace(),
        "Dropped test collection"
    );
    Ok(())
}

/// Drops and then creates the test collection.
pub async fn recreate_collection(
    context: &TestContext,
    encryption: &CollectionEncryption,
) -> Result<()> {
    drop_collection(context, encryption).await?;
    create_collection(context, encryption).await
}
