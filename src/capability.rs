//! Detection of the mechanisms that can enforce automatic encryption.
//!
//! Automatic encryption needs something to analyze commands against the encryption schema. The
//! driver can load the `crypt_shared` library in-process, or it can spawn and talk to the
//! `mongocryptd` daemon. Either one is sufficient, so detection only reports whether each can be
//! found and treats the pair as a single capability.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::{
    env::{self, Environment},
    error::{Error, Result, SkipReason},
    trace::{TracingRepresentation, CAPABILITY_TRACING_EVENT_TARGET},
};

/// File name of the helper daemon executable.
#[cfg(not(windows))]
pub const MONGOCRYPTD_EXECUTABLE: &str = "mongocryptd";
/// File name of the helper daemon executable.
#[cfg(windows)]
pub const MONGOCRYPTD_EXECUTABLE: &str = "mongocryptd.exe";

/// Which encryption-enforcement mechanisms are usable on this host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncryptionCapability {
    /// `CRYPT_SHARED_LIB_PATH` names a file readable by this process.
    pub shared_library_available: bool,

    /// A `mongocryptd` executable is present in one of the `PATH` directories.
    pub helper_daemon_available: bool,
}

impl EncryptionCapability {
    /// Whether at least one mechanism is available.
    pub fn supported(&self) -> bool {
        self.shared_library_available || self.helper_daemon_available
    }

    /// Returns a skip error if no mechanism is available.
    pub fn require(&self) -> Result<()> {
        if self.supported() {
            Ok(())
        } else {
            Err(Error::skip(SkipReason::NoEnforcementMechanism))
        }
    }

    /// The capability of the current process. Detection runs against the process environment the
    /// first time this is called and the result is reused afterwards.
    pub fn current() -> Self {
        static CURRENT: OnceLock<EncryptionCapability> = OnceLock::new();
        *CURRENT.get_or_init(|| CapabilityDetector::new(env::process()).detect())
    }
}

/// Probes the filesystem for `crypt_shared` and `mongocryptd`.
#[derive(Clone, Debug)]
pub struct CapabilityDetector {
    env: Arc<dyn Environment>,
}

impl CapabilityDetector {
    /// Creates a detector that reads its configuration from `env`.
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    /// Determines which mechanisms are available.
    pub fn detect(&self) -> EncryptionCapability {
        let capability = EncryptionCapability {
            shared_library_available: self.shared_library_available(),
            helper_daemon_available: self.helper_daemon_available(),
        };
        tracing::debug!(
            target: CAPABILITY_TRACING_EVENT_TARGET,
            sharedLibraryAvailable = capability.shared_library_available,
            helperDaemonAvailable = capability.helper_daemon_available,
            supported = capability.supported(),
            "Encryption capability detected"
        );
        capability
    }

    /// The configured `crypt_shared` path, if any.
    pub fn shared_library_path(&self) -> Option<PathBuf> {
        env::crypt_shared_lib_path(&*self.env)
    }

    /// Whether the configured `crypt_shared` path can be read.
    pub fn shared_library_available(&self) -> bool {
        let Some(path) = self.shared_library_path() else {
            return false;
        };
        let readable = is_readable_file(&path);
        tracing::debug!(
            target: CAPABILITY_TRACING_EVENT_TARGET,
            path = path.tracing_representation(),
            readable,
            "Probed crypt_shared library"
        );
        readable
    }

    /// The first `mongocryptd` executable found on the search path. Empty entries are skipped
    /// rather than resolved against the working directory.
    pub fn find_helper_daemon(&self) -> Option<PathBuf> {
        let search_path = self.env.var_os(env::PATH)?;
        let search_path = std::env::join_paths(
            std::env::split_paths(&search_path).filter(|dir| !dir.as_os_str().is_empty()),
        )
        .ok()?;
        if search_path.is_empty() {
            return None;
        }
        let cwd = std::env::current_dir().unwrap_or_default();
        which::which_in(MONGOCRYPTD_EXECUTABLE, Some(search_path), cwd).ok()
    }

    /// Whether a `mongocryptd` executable is present on the search path.
    pub fn helper_daemon_available(&self) -> bool {
        let found = self.find_helper_daemon();
        tracing::debug!(
            target: CAPABILITY_TRACING_EVENT_TARGET,
            path = found.as_deref().map(|p| p.tracing_representation()),
            "Probed search path for mongocryptd"
        );
        found.is_some()
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
