use mongodb::{
    bson::Document,
    options::{CreateCollectionOptions, WriteConcern},
    Client,
    Collection,
    Database,
    Namespace,
};
use typed_builder::TypedBuilder;

/// The database and collection a test operates on.
#[derive(Clone, Debug, TypedBuilder)]
#[non_exhaustive]
pub struct TestContext {
    /// The client used for provisioning. This should not have auto encryption enabled.
    pub client: Client,

    /// The name of the test database.
    #[builder(setter(into))]
    pub database_name: String,

    /// The name of the test collection.
    #[builder(setter(into))]
    pub collection_name: String,

    /// The write concern used when creating and dropping the test collection. Defaults to
    /// majority.
    #[builder(default = WriteConcern::majority())]
    pub write_concern: WriteConcern,
}

impl TestContext {
    /// The test database.
    pub fn database(&self) -> Database {
        self.client.database(&self.database_name)
    }

    /// The test collection.
    pub fn collection(&self) -> Collection<Document> {
        self.database().collection(&self.collection_name)
    }

    /// The namespace of the test collection.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database_name.as_str(), self.collection_name.as_str())
    }

    /// The options every test collection is created with before any encryption configuration is
    /// applied.
    pub fn default_create_options(&self) -> CreateCollectionOptions {
        CreateCollectionOptions::builder()
            .write_concern(self.write_concern.clone())
            .build()
    }
}
