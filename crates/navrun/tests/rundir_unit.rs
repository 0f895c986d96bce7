// Test module - relaxed lint rules
#![allow(clippy::default_trait_access)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::inefficient_to_string)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(missing_docs)]

use navrun::model::{ExecutionEnvironment, NavigatorSettings, OrchestratorConfig, RunId};
use navrun::rundir::{PathMode, RunDirectory, CONTAINER_ROOT};
use navrun::runner::error::ErrorCode;
use navrun_fixtures::temp_dir;
use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn settings(enabled: bool) -> NavigatorSettings {
    let environment = ExecutionEnvironment {
        enabled,
        ..ExecutionEnvironment::default()
    };
    NavigatorSettings::from_environment(&environment, &OrchestratorConfig::default(), "podman", 600)
}

fn mode_bits(path: &Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test]
fn directory_names_are_distinct_per_counter() {
    let id = RunId::new();
    let names: BTreeSet<String> =
        (0..3).map(|counter| RunDirectory::name_for(id, counter)).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&format!("navigator-run-{id}-0")));
}

#[test]
fn create_makes_private_directory_with_fixed_layout() {
    let base = temp_dir("rundir");
    let mut settings = settings(false);
    let dir = RunDirectory::create(base.path(), RunId::new(), 0, &mut settings).unwrap();

    assert_eq!(mode_bits(dir.path()), 0o700);
    for sub in ["inventories", "private-keys", "known-hosts", "extra-vars"] {
        let path = dir.path().join(sub);
        assert!(path.is_dir(), "missing {sub}");
        assert_eq!(mode_bits(&path), 0o700);
    }
    assert_eq!(dir.mode(), PathMode::Direct);
    assert!(settings.volume_mounts.is_empty());
}

#[test]
fn written_files_are_owner_only() {
    let base = temp_dir("rundir");
    let dir = RunDirectory::create(base.path(), RunId::new(), 1, &mut settings(false)).unwrap();
    let staged = dir.write_file("playbook.yaml", b"- hosts: all\n").unwrap();
    assert_eq!(std::fs::read_to_string(&staged.host).unwrap(), "- hosts: all\n");
    assert_eq!(mode_bits(&staged.host), 0o600);
}

#[test]
fn direct_mode_resolves_to_host_paths() {
    let base = temp_dir("rundir");
    let dir = RunDirectory::create(base.path(), RunId::new(), 0, &mut settings(false)).unwrap();
    let staged = dir.stage("inventories/hosts.ini");
    assert_eq!(staged.host, staged.resolved);
    assert!(staged.host.starts_with(dir.path()));
}

#[test]
fn container_mode_rebases_onto_container_root_and_mounts_directory() {
    let base = temp_dir("rundir");
    let mut settings = settings(true);
    let dir = RunDirectory::create(base.path(), RunId::new(), 0, &mut settings).unwrap();
    assert_eq!(dir.mode(), PathMode::Container);

    let staged = dir.stage("inventories/hosts.ini");
    assert_eq!(
        staged.resolved,
        Path::new(CONTAINER_ROOT).join("inventories/hosts.ini")
    );
    assert!(staged.host.starts_with(dir.path()));
    assert_eq!(
        settings.volume_mount(dir.path()),
        Some(Path::new(CONTAINER_ROOT))
    );
}

#[test]
fn name_collision_is_an_error() {
    let base = temp_dir("rundir");
    let id = RunId::new();
    let _first = RunDirectory::create(base.path(), id, 4, &mut settings(false)).unwrap();
    let err = RunDirectory::create(base.path(), id, 4, &mut settings(false)).unwrap_err();
    assert_eq!(err.code, ErrorCode::RunDirectory);
}

#[test]
fn missing_base_is_a_staging_error() {
    let base = temp_dir("rundir");
    let missing = base.path().join("does-not-exist");
    let err = RunDirectory::create(&missing, RunId::new(), 0, &mut settings(false)).unwrap_err();
    assert_eq!(err.code, ErrorCode::RunDirectory);

    let file = base.path().join("plain-file");
    std::fs::write(&file, "x").unwrap();
    let err = RunDirectory::create(&file, RunId::new(), 0, &mut settings(false)).unwrap_err();
    assert_eq!(err.code, ErrorCode::RunDirectory);
}

#[test]
fn staged_paths_cannot_escape_the_directory() {
    let base = temp_dir("rundir");
    let dir = RunDirectory::create(base.path(), RunId::new(), 0, &mut settings(false)).unwrap();
    for bad in ["../escape", "/etc/passwd", "inventories/../../x"] {
        let err = dir.write_file(bad, b"x").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidName, "{bad}");
    }
}

#[test]
fn remove_deletes_everything() {
    let base = temp_dir("rundir");
    let dir = RunDirectory::create(base.path(), RunId::new(), 0, &mut settings(false)).unwrap();
    dir.write_file("inventories/hosts.ini", b"[all]\n").unwrap();
    dir.remove().unwrap();
    assert!(!dir.path().exists());
    assert_eq!(dir.remove().unwrap_err().code, ErrorCode::Cleanup);
}
