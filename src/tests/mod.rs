use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;

use crate::DirectoryRegistry;

mod loading;

/// A registry whose search path is a fresh temp directory containing one
/// entry per module name.
fn registry_with_modules(modules: &[&str]) -> (TempDir, DirectoryRegistry) {
    let temp = TempDir::new().unwrap();
    for module in modules {
        temp.child(module).create_dir_all().unwrap();
    }
    let registry = DirectoryRegistry::new(vec![temp.path().to_path_buf()]);
    (temp, registry)
}

/// A requirements file with the given contents, in a fresh temp directory.
fn requirements_file(contents: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let file = temp.child("requirements.txt");
    file.write_str(contents).unwrap();
    let path = file.path().to_path_buf();
    (temp, path)
}

/// An executable stand-in for pip that appends its argv to a log file next to
/// itself and exits with `exit_code`.
#[cfg(unix)]
fn fake_pip(dir: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let program = dir.join("fake-pip");
    let log = dir.join("fake-pip.log");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\nexit {}\n",
        log.display(),
        exit_code
    );
    std::fs::write(&program, script).unwrap();
    let mut permissions = std::fs::metadata(&program).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&program, permissions).unwrap();
    program
}

#[cfg(unix)]
fn fake_pip_log(program: &Path) -> String {
    std::fs::read_to_string(program.with_file_name("fake-pip.log")).unwrap_or_default()
}
