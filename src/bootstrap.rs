//! Per-test setup: decide whether an encryption test can run at all.
//!
//! Setup moves through `Init`, `CapabilityChecked` and `Ready`. A missing prerequisite at either
//! check moves to `Skipped` instead, which is terminal. Test bodies only run from `Ready`, and
//! `Skipped` is reported as a skip rather than a failure.

use std::sync::Arc;

use mongodb::Client;

use crate::{
    capability::EncryptionCapability,
    client::{client_options, setup_client},
    env::{self, Environment},
    error::{Error, Result, SkipReason},
    master_key::MasterKeyProvider,
    server::{server_version, version_at_least, ServerInfo},
    trace::BOOTSTRAP_TRACING_EVENT_TARGET,
};

/// The state of a test's setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarnessState {
    /// Nothing has been checked yet.
    Init,
    /// The deployment supports client-side encryption.
    CapabilityChecked,
    /// An encryption-enforcement mechanism is available; the test can run.
    Ready,
    /// A prerequisite is missing; the test must be skipped.
    Skipped(SkipReason),
}

/// Whether the deployment supports client-side encryption at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseSupport {
    /// Client-side encryption is supported.
    Supported,
    /// Client-side encryption is not supported, for the given reason.
    Unsupported(String),
}

impl BaseSupport {
    /// The oldest server version with client-side field level encryption.
    pub const MIN_SERVER_VERSION: (u64, u64) = (4, 2);

    /// Decides support from a server version.
    pub fn from_version(version: &semver::Version) -> Self {
        let (major, minor) = Self::MIN_SERVER_VERSION;
        if version_at_least(version, major, minor) {
            Self::Supported
        } else {
            Self::Unsupported(format!(
                "Client Side Encryption only supported on server {major}.{minor} or higher, \
                 found {version}"
            ))
        }
    }

    /// Queries the deployment's version through `client`.
    pub async fn check(client: &Client) -> Result<Self> {
        Ok(Self::from_version(&server_version(client).await?))
    }
}

/// Drives a test's setup through its states.
#[derive(Clone, Debug)]
pub struct HarnessBootstrap {
    state: HarnessState,
    capability: Option<EncryptionCapability>,
}

impl Default for HarnessBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessBootstrap {
    /// Starts in `Init`.
    pub fn new() -> Self {
        Self {
            state: HarnessState::Init,
            capability: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> &HarnessState {
        &self.state
    }

    /// The detected capability, once the capability check has run.
    pub fn capability(&self) -> Option<EncryptionCapability> {
        self.capability
    }

    /// `Init -> CapabilityChecked`, or `Init -> Skipped` if the deployment lacks base support.
    pub fn check_base_support(&mut self, support: BaseSupport) -> Result<&HarnessState> {
        self.expect_state(HarnessState::Init, "check base support")?;
        match support {
            BaseSupport::Supported => self.transition(HarnessState::CapabilityChecked),
            BaseSupport::Unsupported(reason) => {
                self.transition(HarnessState::Skipped(SkipReason::BaseSupportUnavailable {
                    reason,
                }))
            }
        }
        Ok(&self.state)
    }

    /// `CapabilityChecked -> Ready`, or `CapabilityChecked -> Skipped` if neither encryption
    /// mechanism is available.
    pub fn check_capability(&mut self, capability: EncryptionCapability) -> Result<&HarnessState> {
        self.expect_state(HarnessState::CapabilityChecked, "check capability")?;
        self.capability = Some(capability);
        if capability.supported() {
            self.transition(HarnessState::Ready);
        } else {
            self.transition(HarnessState::Skipped(SkipReason::NoEnforcementMechanism));
        }
        Ok(&self.state)
    }

    /// Returns the capability if setup reached `Ready`, or a skip error if it was skipped.
    pub fn into_ready(self) -> Result<EncryptionCapability> {
        match (self.state, self.capability) {
            (HarnessState::Ready, Some(capability)) => Ok(capability),
            (HarnessState::Skipped(reason), _) => Err(Error::skip(reason)),
            (state, _) => Err(Error::internal(format!(
                "setup has not finished: state is {state:?}"
            ))),
        }
    }

    /// Runs both checks against a live deployment.
    pub async fn run(
        client: &Client,
        capability: EncryptionCapability,
    ) -> Result<EncryptionCapability> {
        let mut bootstrap = Self::new();
        let support = BaseSupport::check(client).await?;
        if bootstrap.check_base_support(support)? == &HarnessState::CapabilityChecked {
            bootstrap.check_capability(capability)?;
        }
        bootstrap.into_ready()
    }

    fn expect_state(&self, expected: HarnessState, action: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "cannot {action} in state {:?}, expected {expected:?}",
                self.state
            )))
        }
    }

    fn transition(&mut self, next: HarnessState) {
        match &next {
            HarnessState::Skipped(reason) => tracing::info!(
                target: BOOTSTRAP_TRACING_EVENT_TARGET,
                from = ?self.state,
                reason = %reason,
                "Skipping encryption test"
            ),
            _ => tracing::debug!(
                target: BOOTSTRAP_TRACING_EVENT_TARGET,
                from = ?self.state,
                to = ?next,
                "Harness state transition"
            ),
        }
        self.state = next;
    }
}

/// Everything an encryption test needs once setup has reached `Ready`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Harness {
    /// A client without auto encryption, for provisioning.
    pub client: Client,

    /// The detected encryption capability.
    pub capability: EncryptionCapability,

    /// Master key material.
    pub keys: MasterKeyProvider,

    /// The environment the harness was configured from.
    pub env: Arc<dyn Environment>,
}

impl Harness {
    /// Connects to the default deployment and runs setup against the process environment. A
    /// deployment without encryption support or a host without `crypt_shared` and `mongocryptd`
    /// yields a skip error.
    pub async fn setup() -> Result<Self> {
        let client = setup_client().await?;
        let capability = HarnessBootstrap::run(&client, EncryptionCapability::current()).await?;
        let env = env::process();
        Ok(Self {
            client,
            capability,
            keys: MasterKeyProvider::new(env.clone()),
            env,
        })
    }

    /// Server version and topology of the default deployment.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let load_balanced = client_options().await?.load_balanced == Some(true);
        ServerInfo::fetch(&self.client, load_balanced).await
    }
}
