//! Contains the `Error` and `Result` types that the harness uses.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// The result type for all methods that can return an error in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while provisioning an encryption test. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is boxed to keep the `Result` type small.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn skip(reason: SkipReason) -> Self {
        ErrorKind::Skip(reason).into()
    }

    pub(crate) fn setup(step: SetupStep, source: mongodb::error::Error) -> Self {
        ErrorKind::Setup { step, source }.into()
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ErrorKind::Internal {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn configuration_ambiguity(message: impl Into<String>) -> Self {
        ErrorKind::ConfigurationAmbiguity {
            message: message.into(),
        }
        .into()
    }

    /// Whether this error means the current test should be skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Skip(_))
    }

    /// The reason the current test should be skipped, if this is a skip.
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self.kind.as_ref() {
            ErrorKind::Skip(reason) => Some(reason),
            _ => None,
        }
    }

    /// The provisioning step that failed, if this is a setup failure.
    pub fn setup_step(&self) -> Option<SetupStep> {
        match self.kind.as_ref() {
            ErrorKind::Setup { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self::new(err.into())
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for ErrorKind {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A prerequisite of the test environment is absent. The test should be reported as
    /// skipped, never as failed.
    #[error("Test skipped: {0}")]
    Skip(SkipReason),

    /// A provisioning step failed against a reachable deployment.
    #[error("Setup step {step} failed: {source}")]
    #[non_exhaustive]
    Setup {
        step: SetupStep,
        source: mongodb::error::Error,
    },

    /// Both collection encryption modes were supplied for a single collection.
    #[error("Ambiguous collection encryption configuration: {message}")]
    #[non_exhaustive]
    ConfigurationAmbiguity { message: String },

    /// An invalid argument was provided.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    #[error("Internal error: {message}")]
    #[non_exhaustive]
    Internal { message: String },

    /// Wrapper around a driver error raised outside of a provisioning step.
    #[error("Driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Wrapper around [`std::io::Error`].
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Wrapper around [`serde_json::Error`].
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),
}

/// Why a test cannot run in the current environment.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SkipReason {
    /// A required environment variable is not defined.
    MissingEnvironmentVariable {
        /// The name of the variable.
        name: String,
    },

    /// The deployment or driver build does not support client-side encryption at all.
    BaseSupportUnavailable {
        /// What is unsupported.
        reason: String,
    },

    /// Neither `crypt_shared` nor `mongocryptd` could be found.
    NoEnforcementMechanism,

    /// The deployment does not meet a requirement of a particular test.
    ServerRequirement {
        /// The requirement that is not met.
        reason: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnvironmentVariable { name } => {
                write!(f, "Environment variable \"{name}\" is not defined")
            }
            Self::BaseSupportUnavailable { reason } => write!(f, "{reason}"),
            Self::NoEnforcementMechanism => {
                write!(f, "Neither crypt_shared nor mongocryptd are available")
            }
            Self::ServerRequirement { reason } => write!(f, "{reason}"),
        }
    }
}

/// A provisioning step that talks to the deployment.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
#[non_exhaustive]
pub enum SetupStep {
    #[display("drop key vault")]
    DropKeyVault,
    #[display("seed key vault")]
    SeedKeyVault,
    #[display("drop collection")]
    DropCollection,
    #[display("create collection")]
    CreateCollection,
    #[display("server metadata")]
    ServerMetadata,
}
