use run_config::{overrides, ConfigError, Precision, RunConfig};
use std::path::PathBuf;

fn shipped() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/config.yaml")
}

#[test]
fn shipped_config_loads() {
    let config = RunConfig::load(shipped(), &[]).unwrap();
    assert_eq!(config.dataset.history_max_len, 200);
    assert_eq!(config.trainer.precision, Precision::Half);
    assert!(config.consistency_warnings().is_empty());
}

#[test]
fn command_line_overrides_apply_to_shipped_config() {
    let items = overrides::parse_all(&["trainer.max_epochs=10", "trainer.precision=32"]).unwrap();
    let config = RunConfig::load(shipped(), &items).unwrap();
    assert_eq!(config.trainer.max_epochs, 10);
    assert_eq!(config.trainer.precision, Precision::Full);

    let items = overrides::parse_all(&["model.nonexistent_field=1"]).unwrap();
    let err = RunConfig::load(shipped(), &items).unwrap_err();
    assert!(matches!(err, ConfigError::Override { .. }));
    assert_eq!(err.key_path(), Some("model.nonexistent_field"));
}
