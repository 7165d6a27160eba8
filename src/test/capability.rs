use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::{
    bootstrap::{BaseSupport, HarnessBootstrap, HarnessState},
    capability::{CapabilityDetector, EncryptionCapability, MONGOCRYPTD_EXECUTABLE},
    env::{StaticEnvironment, CRYPT_SHARED_LIB_PATH, PATH},
    error::SkipReason,
    log_uncaptured,
};

fn detector(env: StaticEnvironment) -> CapabilityDetector {
    CapabilityDetector::new(Arc::new(env))
}

fn search_path<'a>(dirs: impl IntoIterator<Item = &'a Path>) -> OsString {
    std::env::join_paths(dirs).unwrap()
}

fn write_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"").unwrap();
    path
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Whether file permission bits apply to this process. They do not for root.
#[cfg(unix)]
fn permissions_enforced(dir: &Path) -> bool {
    let path = write_file(dir, "permission-check");
    set_mode(&path, 0o000);
    fs::File::open(&path).is_err()
}

fn write_daemon(dir: &Path) -> PathBuf {
    let path = write_file(dir, MONGOCRYPTD_EXECUTABLE);
    #[cfg(unix)]
    set_mode(&path, 0o755);
    path
}

#[test]
fn nothing_configured() {
    let capability = detector(StaticEnvironment::new()).detect();

    assert_eq!(capability, EncryptionCapability::default());
    assert!(!capability.supported());
    assert_eq!(
        capability.require().unwrap_err().skip_reason(),
        Some(&SkipReason::NoEnforcementMechanism)
    );
}

#[test]
fn readable_shared_library() {
    let dir = TempDir::new().unwrap();
    let library = write_file(dir.path(), "mongo_crypt_v1.so");

    let capability =
        detector(StaticEnvironment::new().with(CRYPT_SHARED_LIB_PATH, &library)).detect();

    assert!(capability.shared_library_available);
    assert!(!capability.helper_daemon_available);
    assert!(capability.supported());
}

#[test]
fn missing_shared_library() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("mongo_crypt_v1.so");

    let detector = detector(StaticEnvironment::new().with(CRYPT_SHARED_LIB_PATH, &library));

    assert_eq!(detector.shared_library_path(), Some(library));
    assert!(!detector.shared_library_available());
}

#[test]
fn shared_library_path_is_directory() {
    let dir = TempDir::new().unwrap();

    let detector = detector(StaticEnvironment::new().with(CRYPT_SHARED_LIB_PATH, dir.path()));

    assert!(!detector.shared_library_available());
}

#[test]
fn empty_shared_library_path() {
    let detector = detector(StaticEnvironment::new().with(CRYPT_SHARED_LIB_PATH, ""));

    assert_eq!(detector.shared_library_path(), None);
    assert!(!detector.shared_library_available());
}

#[cfg(unix)]
#[test]
#[function_name::named]
fn unreadable_shared_library() {
    let dir = TempDir::new().unwrap();
    let library = write_file(dir.path(), "mongo_crypt_v1.so");
    set_mode(&library, 0o000);
    if !permissions_enforced(dir.path()) {
        log_uncaptured(format!(
            "skipping {}: permission bits are not enforced for this user",
            function_name!()
        ));
        return;
    }

    let detector = detector(StaticEnvironment::new().with(CRYPT_SHARED_LIB_PATH, &library));

    assert!(!detector.shared_library_available());
}

#[test]
fn daemon_in_later_search_path_entry() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let daemon = write_daemon(second.path());

    let detector = detector(
        StaticEnvironment::new().with(PATH, search_path([first.path(), second.path()])),
    );
    let capability = detector.detect();

    assert_eq!(detector.find_helper_daemon(), Some(daemon));
    assert!(!capability.shared_library_available);
    assert!(capability.helper_daemon_available);
    assert!(capability.supported());
}

#[test]
fn first_daemon_on_search_path_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let expected = write_daemon(first.path());
    write_daemon(second.path());

    let detector = detector(
        StaticEnvironment::new().with(PATH, search_path([first.path(), second.path()])),
    );

    assert_eq!(detector.find_helper_daemon(), Some(expected));
}

#[cfg(unix)]
#[test]
fn daemon_without_execute_permission() {
    let dir = TempDir::new().unwrap();
    let daemon = write_file(dir.path(), MONGOCRYPTD_EXECUTABLE);
    set_mode(&daemon, 0o644);

    let detector = detector(StaticEnvironment::new().with(PATH, search_path([dir.path()])));

    assert!(!detector.helper_daemon_available());
}

#[cfg(unix)]
#[test]
#[function_name::named]
fn daemon_executable_only_by_others_is_not_detected() {
    let dir = TempDir::new().unwrap();
    if !permissions_enforced(dir.path()) {
        log_uncaptured(format!(
            "skipping {}: permission bits are not enforced for this user",
            function_name!()
        ));
        return;
    }
    // The owner's bits decide for the owner, so group and other execute bits do not help.
    let daemon = write_file(dir.path(), MONGOCRYPTD_EXECUTABLE);
    set_mode(&daemon, 0o677);

    let detector = detector(StaticEnvironment::new().with(PATH, search_path([dir.path()])));

    assert_eq!(detector.find_helper_daemon(), None);
    assert!(!detector.detect().supported());
}

#[cfg(unix)]
#[test]
fn daemon_executable_by_owner_is_detected() {
    let dir = TempDir::new().unwrap();
    let daemon = write_file(dir.path(), MONGOCRYPTD_EXECUTABLE);
    set_mode(&daemon, 0o700);

    let detector = detector(StaticEnvironment::new().with(PATH, search_path([dir.path()])));

    assert_eq!(detector.find_helper_daemon(), Some(daemon));
}

#[test]
fn daemon_name_is_a_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(MONGOCRYPTD_EXECUTABLE)).unwrap();

    let detector = detector(StaticEnvironment::new().with(PATH, search_path([dir.path()])));

    assert!(!detector.helper_daemon_available());
}

#[test]
fn empty_or_unset_search_path() {
    assert!(!detector(StaticEnvironment::new()).helper_daemon_available());
    assert!(!detector(StaticEnvironment::new().with(PATH, "")).helper_daemon_available());
}

#[cfg(unix)]
#[test]
fn empty_search_path_entries_are_ignored() {
    let dir = TempDir::new().unwrap();
    let daemon = write_daemon(dir.path());
    let mut path = OsString::from("::");
    path.push(dir.path());

    let detector = detector(StaticEnvironment::new().with(PATH, path));

    assert_eq!(detector.find_helper_daemon(), Some(daemon));
}

#[test]
fn both_mechanisms() {
    let lib_dir = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();
    let library = write_file(lib_dir.path(), "mongo_crypt_v1.so");
    write_daemon(bin_dir.path());

    let capability = detector(
        StaticEnvironment::new()
            .with(CRYPT_SHARED_LIB_PATH, &library)
            .with(PATH, search_path([bin_dir.path()])),
    )
    .detect();

    assert_eq!(
        capability,
        EncryptionCapability {
            shared_library_available: true,
            helper_daemon_available: true,
        }
    );
}

#[test]
fn undetected_capability_skips_setup() {
    let dir = TempDir::new().unwrap();
    let capability =
        detector(StaticEnvironment::new().with(PATH, search_path([dir.path()]))).detect();

    let mut bootstrap = HarnessBootstrap::new();
    bootstrap.check_base_support(BaseSupport::Supported).unwrap();
    let state = bootstrap.check_capability(capability).unwrap();

    assert_eq!(
        state,
        &HarnessState::Skipped(SkipReason::NoEnforcementMechanism)
    );
    assert!(bootstrap.into_ready().unwrap_err().is_skip());
}
