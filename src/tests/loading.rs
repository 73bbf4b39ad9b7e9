use assert_fs::prelude::*;

use super::registry_with_modules;
use crate::{Loader, ModuleRegistry, PipDependency};

#[test]
fn test_load_then_is_loaded() {
    let (_modules, mut registry) = registry_with_modules(&["requests"]);
    let dependency = PipDependency::new("requests");

    dependency.load(&mut registry);
    assert!(dependency.is_loaded(&registry));
}

#[test]
fn test_load_is_idempotent() {
    let (_modules, mut registry) = registry_with_modules(&["requests"]);
    let dependency = PipDependency::new("requests");

    dependency.load(&mut registry);
    let before = registry.loaded_module("requests").cloned();
    dependency.load(&mut registry);

    assert_eq!(registry.loaded_module("requests").cloned(), before);
}

#[test]
fn test_load_of_unknown_module_is_silent() {
    let (_modules, mut registry) = registry_with_modules(&[]);
    let dependency = PipDependency::new("ghost");

    dependency.load(&mut registry);
    assert!(!dependency.is_loaded(&registry));
}

#[test]
fn test_unload_then_is_loaded_is_false() {
    let (_modules, mut registry) = registry_with_modules(&["requests"]);
    let dependency = PipDependency::new("requests");

    dependency.load(&mut registry);
    dependency.unload(&mut registry);
    assert!(!dependency.is_loaded(&registry));

    // Unloading again is harmless.
    dependency.unload(&mut registry);
    assert!(!dependency.is_loaded(&registry));
}

#[test]
fn test_reload_on_never_loaded_matches_load() {
    let (_modules, mut registry) = registry_with_modules(&["requests"]);
    let dependency = PipDependency::new("requests");

    dependency.reload(&mut registry);

    assert!(dependency.is_loaded(&registry));
    assert_eq!(registry.loaded_module("requests").unwrap().generation, 0);
}

#[test]
fn test_reload_reexecutes_in_place() {
    let (_modules, mut registry) = registry_with_modules(&["requests"]);
    let dependency = PipDependency::new("requests");

    dependency.load(&mut registry);
    dependency.reload(&mut registry);

    assert!(dependency.is_loaded(&registry));
    assert_eq!(registry.loaded_module("requests").unwrap().generation, 1);
}

#[test]
fn test_modules_appearing_after_a_scan_need_invalidation() {
    let (modules, mut registry) = registry_with_modules(&[]);
    let dependency = PipDependency::new("late");

    dependency.load(&mut registry);
    assert!(!dependency.is_loaded(&registry));

    modules.child("late").create_dir_all().unwrap();

    // The cached scan still misses it.
    dependency.load(&mut registry);
    assert!(!dependency.is_loaded(&registry));

    registry.invalidate_caches();
    dependency.load(&mut registry);
    assert!(dependency.is_loaded(&registry));
}

#[test]
fn test_import_name_override_for_mismatched_distributions() {
    let (_modules, mut registry) = registry_with_modules(&["PIL"]);
    let dependency = PipDependency::new("PIL").with_package("pillow>=9.0");

    dependency.load(&mut registry);

    assert!(dependency.is_loaded(&registry));
    assert_eq!(dependency.package_spec(), "pillow>=9.0");
}
