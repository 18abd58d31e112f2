// Unit tests for host directory layout

use crate::paths::HostPaths;

use tempfile::TempDir;

/// **VALUE**: Verifies ensure() creates every directory the host writes to.
///
/// **BUG THIS CATCHES**: Would catch the log or data directory being skipped, which
/// surfaces later as a logger or cache write failure.
#[test]
fn given_fresh_root_when_ensure_then_all_dirs_exist() {
    // GIVEN: Paths under an empty root
    let root = TempDir::new().expect("temp dir");
    let paths = HostPaths::under(root.path());

    // WHEN: Ensuring them
    paths.ensure().expect("ensure should succeed");

    // THEN: All three exist and are distinct
    assert!(paths.config_dir.is_dir());
    assert!(paths.log_dir.is_dir());
    assert!(paths.data_dir.is_dir());
    assert_ne!(paths.config_dir, paths.data_dir);
}
