use mongodb::bson::{Bson, Document};

pub(crate) const CAPABILITY_TRACING_EVENT_TARGET: &str = "mongodb_csfle_harness::capability";
pub(crate) const PROVISION_TRACING_EVENT_TARGET: &str = "mongodb_csfle_harness::provision";
pub(crate) const BOOTSTRAP_TRACING_EVENT_TARGET: &str = "mongodb_csfle_harness::bootstrap";

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        Bson::Document(self.clone())
            .into_relaxed_extjson()
            .to_string()
    }
}

impl TracingRepresentation for std::path::Path {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.display().to_string()
    }
}
