mod capability;

use std::{path::PathBuf, time::Duration};

use mongodb::{bson::doc, Client};
use tokio::sync::OnceCell;

use crate::{
    client::{client_options, setup_client},
    error::Result,
    log_uncaptured,
    TestContext,
};

/// Whether a deployment is reachable at the default URI. Probed once per process with a short
/// server selection timeout so that runs without a server do not stall on every test.
pub(crate) async fn server_available() -> bool {
    static AVAILABLE: OnceCell<bool> = OnceCell::const_new();
    *AVAILABLE
        .get_or_init(|| async {
            let Ok(options) = client_options().await else {
                return false;
            };
            let mut options = options.clone();
            options.server_selection_timeout = Some(Duration::from_secs(2));
            let Ok(client) = Client::with_options(options) else {
                return false;
            };
            client
                .database("admin")
                .run_command(doc! { "ping": 1 })
                .await
                .is_ok()
        })
        .await
}

/// A provisioning client, or `None` (after logging a skip notice) if no deployment is reachable.
pub(crate) async fn live_client(test_name: &str) -> Result<Option<Client>> {
    if !server_available().await {
        log_uncaptured(format!("skipping {test_name}: no server available"));
        return Ok(None);
    }
    Ok(Some(setup_client().await?))
}

/// A context targeting a database and collection named after the test.
pub(crate) fn test_context(client: Client, test_name: &str) -> TestContext {
    TestContext::builder()
        .client(client)
        .database_name(test_name)
        .collection_name(test_name)
        .build()
}

pub(crate) fn testdata_path(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "testdata", name].iter().collect()
}
