// tests/config_validation.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder, TrainingBuilder};

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use trainwatch::config::{load_and_validate, load_from_path, ConfigFile};
use trainwatch::errors::TrainwatchError;
use trainwatch::types::TieBreak;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

fn expect_config_error(toml: &str, needle: &str) -> TestResult {
    let file = write_config(toml)?;
    match load_and_validate(file.path()) {
        Err(TrainwatchError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "error {msg:?} should mention {needle:?}");
            Ok(())
        }
        other => panic!("expected ConfigError mentioning {needle:?}, got {other:?}"),
    }
}

#[test]
fn full_config_loads_with_defaults() -> TestResult {
    let file = write_config(
        r#"
[dataset]
path = "dataset"

[[task]]
label = "model download"
cmd = "hf download Wan-AI/Wan2.1-T2V-14B --local-dir models/wan"
timeout = "2h"
error_pattern = "Error:"
success_pattern = "All done!"

[[task]]
label = "cache latents"
cmd = "python cache_latents.py"
log = "logs/latents.log"
timeout = "30m"

[training]
cmd = "deepspeed --num_gpus=1 train.py --config train.toml"
output_root = "output"
run_name = "mylora"
"#,
    )?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.settings.poll_interval, Duration::from_secs(3));
    assert_eq!(cfg.settings.relay_interval, Duration::from_millis(250));
    assert_eq!(cfg.settings.watch_interval, Duration::from_secs(30));
    assert_eq!(cfg.settings.window_lines, 50);
    assert_eq!(cfg.settings.tie_break, TieBreak::Success);
    assert!(cfg.settings.settle);

    let dataset = cfg.dataset.as_ref().expect("dataset section");
    assert_eq!(dataset.path, PathBuf::from("dataset"));
    assert!(!dataset.require_captions);

    assert_eq!(cfg.tasks.len(), 2);
    assert_eq!(cfg.tasks[0].label, "model download");
    assert_eq!(cfg.tasks[0].timeout, Duration::from_secs(2 * 60 * 60));
    assert_eq!(cfg.tasks[0].log, PathBuf::from("logs/model_download.log"));
    assert_eq!(cfg.tasks[0].error_pattern.as_ref().map(|r| r.as_str()), Some("Error:"));
    assert_eq!(cfg.tasks[1].log, PathBuf::from("logs/latents.log"));
    assert!(cfg.tasks[1].success_pattern.is_none());

    let training = cfg.training.as_ref().expect("training section");
    assert_eq!(training.plan.artifact, "adapter_model.safetensors");
    assert_eq!(training.plan.destination_name(3), "mylora_3.safetensors");
    assert!(training.archive);
    Ok(())
}

#[test]
fn config_section_overrides() -> TestResult {
    let file = write_config(
        r#"
[config]
poll_interval = "500ms"
watch_interval = "1m"
window_lines = 10
tie_break = "error"
settle = false

[training]
cmd = "python train.py"
output_root = "out"
run_name = "style"
artifact = "model.pt"
archive = false
"#,
    )?;

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.settings.poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.settings.watch_interval, Duration::from_secs(60));
    assert_eq!(cfg.settings.window_lines, 10);
    assert_eq!(cfg.settings.tie_break, TieBreak::Error);
    assert!(!cfg.settings.settle);
    assert!(cfg.tasks.is_empty());

    let training = cfg.training.expect("training");
    assert_eq!(training.plan.destination_name(1), "style_1.pt");
    assert!(!training.archive);
    Ok(())
}

#[test]
fn missing_file_is_io_error() {
    let res = load_and_validate("/definitely/not/here/Trainwatch.toml");
    assert!(matches!(res, Err(TrainwatchError::IoError(_))));
}

#[test]
fn malformed_toml_is_toml_error() -> TestResult {
    let file = write_config("[[task]\nlabel = ")?;
    assert!(matches!(load_from_path(file.path()), Err(TrainwatchError::TomlError(_))));
    Ok(())
}

#[test]
fn task_without_timeout_is_rejected_at_parse_time() -> TestResult {
    let file = write_config("[[task]]\nlabel = \"a\"\ncmd = \"true\"\n")?;
    assert!(matches!(load_from_path(file.path()), Err(TrainwatchError::TomlError(_))));
    Ok(())
}

#[test]
fn unknown_tie_break_is_rejected() -> TestResult {
    let file = write_config(
        "[config]\ntie_break = \"maybe\"\n\n[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"1s\"\n",
    )?;
    assert!(matches!(load_from_path(file.path()), Err(TrainwatchError::TomlError(_))));
    Ok(())
}

#[test]
fn empty_config_is_rejected() -> TestResult {
    expect_config_error("", "at least one")
}

#[test]
fn duplicate_labels_are_rejected() -> TestResult {
    expect_config_error(
        r#"
[[task]]
label = "download"
cmd = "true"
timeout = "1s"

[[task]]
label = "download"
cmd = "false"
timeout = "1s"
"#,
        "duplicate task label",
    )
}

#[test]
fn bad_durations_are_rejected() -> TestResult {
    expect_config_error(
        "[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"10\"\n",
        "missing a unit",
    )?;
    expect_config_error(
        "[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"0s\"\n",
        "greater than zero",
    )?;
    expect_config_error(
        "[config]\npoll_interval = \"3d\"\n\n[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"1s\"\n",
        "poll_interval",
    )
}

#[test]
fn zero_window_is_rejected() -> TestResult {
    expect_config_error(
        "[config]\nwindow_lines = 0\n\n[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"1s\"\n",
        "window_lines",
    )
}

#[test]
fn invalid_and_empty_patterns_are_rejected() -> TestResult {
    expect_config_error(
        "[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"1s\"\nerror_pattern = \"(unclosed\"\n",
        "invalid error_pattern",
    )?;
    expect_config_error(
        "[[task]]\nlabel = \"a\"\ncmd = \"true\"\ntimeout = \"1s\"\nsuccess_pattern = \"\"\n",
        "success_pattern must not be empty",
    )
}

#[test]
fn blank_label_and_cmd_are_rejected() -> TestResult {
    expect_config_error(
        "[[task]]\nlabel = \"  \"\ncmd = \"true\"\ntimeout = \"1s\"\n",
        "non-empty label",
    )?;
    expect_config_error(
        "[[task]]\nlabel = \"a\"\ncmd = \" \"\ntimeout = \"1s\"\n",
        "empty cmd",
    )
}

#[test]
fn training_section_is_checked() -> TestResult {
    let cases = [
        (TrainingBuilder::new("", "out", "run").build(), "cmd"),
        (TrainingBuilder::new("train", "out", " ").build(), "run_name must not be empty"),
        (TrainingBuilder::new("train", "out", "a/b").build(), "path separator"),
        (
            TrainingBuilder::new("train", "out", "run").artifact("adapter").build(),
            "file extension",
        ),
    ];

    for (training, needle) in cases {
        let raw = ConfigFileBuilder::new().with_training(training).raw();
        match ConfigFile::try_from(raw) {
            Err(TrainwatchError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "error {msg:?} should mention {needle:?}")
            }
            other => panic!("expected ConfigError for {needle:?}, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn builder_produces_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("Fetch Weights", "true")
                .timeout("5m")
                .error_pattern("Error:")
                .build(),
        )
        .build();

    assert_eq!(cfg.tasks[0].label, "Fetch Weights");
    assert_eq!(cfg.tasks[0].log, PathBuf::from("logs/fetch_weights.log"));
    assert_eq!(cfg.tasks[0].timeout, Duration::from_secs(300));
    assert_eq!(cfg.settings.poll_interval, Duration::from_millis(100));
}
