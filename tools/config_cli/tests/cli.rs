use std::path::PathBuf;
use std::process::{Command, Output};

fn shipped() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/config.yaml")
}

fn cmg_config(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cmg-config"))
        .args(args)
        .output()
        .expect("failed to run cmg-config")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn validate_accepts_shipped_config_with_overrides() {
    let config = shipped();
    let output = cmg_config(&["validate", "--config", config.to_str().unwrap(), "trainer.max_epochs=10"]);
    assert!(output.status.success(), "{}", stderr(&output));
}

#[test]
fn missing_file_exits_with_kind_prefix() {
    let output = cmg_config(&["validate", "--config", "no/such/config.yaml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error[NotFoundError]: "));
}

#[test]
fn failures_name_the_offending_key() {
    let config = shipped();
    let config = config.to_str().unwrap();

    let output = cmg_config(&["validate", "--config", config, "dataset.train_dataloader_conf.batch_size=0"]);
    assert_eq!(output.status.code(), Some(1));
    let message = stderr(&output);
    assert!(message.starts_with("error[ValidationError]: "));
    assert!(message.contains("dataset.train_dataloader_conf.batch_size"));

    let output = cmg_config(&["validate", "--config", config, "model.nonexistent_field=1"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error[OverrideError]: "));
}

#[test]
fn get_prints_values_and_rejects_unknown_keys() {
    let config = shipped();
    let config = config.to_str().unwrap();

    let output = cmg_config(&["get", "--key", "trainer.max_epochs", "--config", config, "trainer.max_epochs=7"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "7");

    let output = cmg_config(&["get", "--key", "model.nonexistent", "--config", config]);
    assert_eq!(output.status.code(), Some(1));
    let message = stderr(&output);
    assert!(message.starts_with("error[OverrideError]: "));
    assert!(message.contains("model.nonexistent"));
}
