//! Defaults loaded from the config file

use std::fs;

use remoter_config::RemoterConfig;
use remoter_core::{Deferred, Registry};
use remoter_types::Setting;
use tempfile::TempDir;

#[test]
fn config_defaults_drive_a_registry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[defaults]\nfinally_argument = false\nnative_composition = false\n",
    )
    .unwrap();

    let defaults = RemoterConfig::load_from(&path).unwrap().settings();
    assert_eq!(defaults.instance_argument, Setting::Inherit);

    let registry = Registry::with_defaults(defaults);
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry);
    let resolved = deferred.resolved_settings();
    assert!(resolved.instance_argument);
    assert!(!resolved.finally_argument);
    assert!(!resolved.native_composition);
}
