//! Test provisioning for the MongoDB Rust driver's client-side field level encryption and
//! queryable encryption support.
//!
//! Encryption tests depend on state the driver cannot create for them: something to enforce
//! automatic encryption on the host, key material, a key vault holding wrapped data keys, and a
//! collection configured for the encryption mode under test. This crate prepares that state in a
//! reproducible way and reports missing prerequisites as skips instead of failures.
//!
//! # Setup
//!
//! [`Harness::setup`] runs once per test. It checks that the deployment supports client-side
//! encryption and that either the `crypt_shared` library (via `CRYPT_SHARED_LIB_PATH`) or the
//! `mongocryptd` executable (via `PATH`) is available:
//!
//! ```no_run
//! # use mongodb_csfle_harness::{error::Result, Harness, key_vault, log_uncaptured};
//! # async fn func() -> Result<()> {
//! let harness = match Harness::setup().await {
//!     Ok(harness) => harness,
//!     Err(e) if e.is_skip() => {
//!         log_uncaptured(format!("skipping: {e}"));
//!         return Ok(());
//!     }
//!     Err(e) => return Err(e),
//! };
//! key_vault::reset(&harness.client, &[]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Provisioning
//!
//! - [`key_vault::reset`] drops `keyvault.datakeys` and seeds it with the given documents.
//! - [`collection::create_collection`] creates the test collection as a plain collection, with
//!   `encryptedFields`, or with a `$jsonSchema` validator, chosen by [`CollectionEncryption`].
//! - [`MasterKeyProvider`] supplies the local master key and AWS credentials.
//!
//! # Logging
//!
//! Provisioning emits [`tracing`] events under the `mongodb_csfle_harness` target prefix.

#![warn(missing_docs)]
#![allow(clippy::derive_partial_eq_without_eq)]

pub mod bootstrap;
pub mod capability;
pub mod client;
pub mod collection;
mod context;
pub mod env;
pub mod error;
pub mod key_vault;
pub mod master_key;
pub mod server;
mod trace;
mod util;

#[cfg(test)]
mod test;

pub use crate::{
    bootstrap::{BaseSupport, Harness, HarnessBootstrap, HarnessState},
    capability::{CapabilityDetector, EncryptionCapability},
    collection::CollectionEncryption,
    context::TestContext,
    error::{Error, ErrorKind, Result, SkipReason},
    master_key::{local_master_key, AwsCredentials, MasterKeyProvider, LOCAL_MASTER_KEY_BASE64},
    util::{log_uncaptured, TestLock, LOCK},
};
