//! Server version and topology checks.

use mongodb::{bson::doc, Client};

use crate::error::{Error, Result, SetupStep, SkipReason};

/// The type of deployment the harness is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Topology {
    #[display("single")]
    Single,
    #[display("replicaset")]
    ReplicaSet,
    #[display("sharded")]
    Sharded,
    #[display("load-balanced")]
    LoadBalanced,
}

/// Facts about the deployment that decide which tests can run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    /// The server version, ignoring any prerelease tag.
    pub version: semver::Version,

    /// The deployment topology.
    pub topology: Topology,
}

impl ServerInfo {
    /// Queries the deployment through `client`. `load_balanced` should match the option the
    /// client was created with, since a load balancer hides the topology behind it.
    pub async fn fetch(client: &Client, load_balanced: bool) -> Result<Self> {
        let version = server_version(client).await?;

        let topology = if load_balanced {
            Topology::LoadBalanced
        } else {
            let hello = client
                .database("admin")
                .run_command(doc! { "hello": 1 })
                .await
                .map_err(|e| Error::setup(SetupStep::ServerMetadata, e))?;
            if hello.get_str("msg").ok() == Some("isdbgrid") {
                Topology::Sharded
            } else if hello.contains_key("setName") {
                Topology::ReplicaSet
            } else {
                Topology::Single
            }
        };

        Ok(Self { version, topology })
    }

    /// Whether the server version is at least `major.minor`.
    pub fn version_gte(&self, major: u64, minor: u64) -> bool {
        version_at_least(&self.version, major, minor)
    }

    /// Whether the server version is older than `major.minor`.
    pub fn version_lt(&self, major: u64, minor: u64) -> bool {
        !self.version_gte(major, minor)
    }

    /// Returns a skip error unless the deployment supports queryable encryption, which needs a
    /// 7.0+ server that is not a standalone.
    pub fn require_queryable_encryption(&self) -> Result<()> {
        if self.version_lt(7, 0) {
            return Err(Error::skip(SkipReason::ServerRequirement {
                reason: format!(
                    "Queryable encryption requires server 7.0+, found {}",
                    self.version
                ),
            }));
        }
        if self.topology == Topology::Single {
            return Err(Error::skip(SkipReason::ServerRequirement {
                reason: "Queryable encryption is not supported on standalone servers".to_string(),
            }));
        }
        Ok(())
    }
}

/// Whether `version` is at least `major.minor`. Patch and prerelease are ignored.
pub(crate) fn version_at_least(version: &semver::Version, major: u64, minor: u64) -> bool {
    version.major > major || version.major == major && version.minor >= minor
}

/// The server version reported by `buildInfo`, ignoring any prerelease tag.
pub async fn server_version(client: &Client) -> Result<semver::Version> {
    let build_info = client
        .database("admin")
        .run_command(doc! { "buildInfo": 1 })
        .await
        .map_err(|e| Error::setup(SetupStep::ServerMetadata, e))?;
    let version = build_info.get_str("version").map_err(|_| {
        Error::invalid_argument(format!("buildInfo reply has no version: {build_info}"))
    })?;
    parse_server_version(version)
}

pub(crate) fn parse_server_version(version: &str) -> Result<semver::Version> {
    let mut version = semver::Version::parse(version).map_err(|e| {
        Error::invalid_argument(format!("invalid server version {version:?}: {e}"))
    })?;
    version.pre = semver::Prerelease::EMPTY;
    Ok(version)
}
