//! Environment variable lookup.

use std::{
    collections::HashMap,
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::PathBuf,
    sync::Arc,
};

use crate::error::{Error, Result, SkipReason};

/// Name of the variable holding the path to the `crypt_shared` library.
pub const CRYPT_SHARED_LIB_PATH: &str = "CRYPT_SHARED_LIB_PATH";
/// Name of the process search path variable.
pub const PATH: &str = "PATH";
/// Name of the variable holding the AWS access key id.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Name of the variable holding the AWS secret access key.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// A source of environment variables.
///
/// The harness reads its configuration through this trait rather than directly from the process
/// so that detection and credential lookup can be exercised against a fixed set of variables.
pub trait Environment: Send + Sync + Debug {
    /// Returns the raw value of the variable, or `None` if it is not defined.
    fn var_os(&self, name: &str) -> Option<OsString>;

    /// Returns the value of the variable as a string, or `None` if it is not defined or is not
    /// valid unicode.
    fn var(&self, name: &str) -> Option<String> {
        self.var_os(name).and_then(|value| value.into_string().ok())
    }

    /// Returns the value of the variable, or a skip error naming it if it is not defined. A
    /// defined value that is not valid unicode is an invalid argument, not a skip.
    fn require(&self, name: &str) -> Result<String> {
        let value = self.var_os(name).ok_or_else(|| {
            Error::skip(SkipReason::MissingEnvironmentVariable {
                name: name.to_string(),
            })
        })?;
        value.into_string().map_err(|_| {
            Error::invalid_argument(format!(
                "environment variable \"{name}\" is not valid unicode"
            ))
        })
    }
}

/// The environment of the current process.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var_os(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }
}

/// A fixed set of variables. Nothing is read from the process environment.
#[derive(Clone, Debug, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, OsString>,
}

impl StaticEnvironment {
    /// Creates an environment with no variables defined.
    pub fn new() -> Self {
        Default::default()
    }

    /// Defines `name` with the given value.
    pub fn with(mut self, name: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.vars.insert(name.into(), value.as_ref().to_os_string());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticEnvironment
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |env, (name, value)| env.with(name, value))
    }
}

impl Environment for StaticEnvironment {
    fn var_os(&self, name: &str) -> Option<OsString> {
        self.vars.get(name).cloned()
    }
}

impl<T: Environment + ?Sized> Environment for Arc<T> {
    fn var_os(&self, name: &str) -> Option<OsString> {
        (**self).var_os(name)
    }
}

/// Returns the environment of the current process as a shared trait object.
pub fn process() -> Arc<dyn Environment> {
    Arc::new(ProcessEnvironment)
}

/// The configured `crypt_shared` library path. An empty value counts as unset.
pub fn crypt_shared_lib_path(env: &dyn Environment) -> Option<PathBuf> {
    env.var_os(CRYPT_SHARED_LIB_PATH)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}
