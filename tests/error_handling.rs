// tests/error_handling.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use trainwatch::errors::TrainwatchError;
use trainwatch::monitor::FailureReason;
use trainwatch::types::TieBreak;

#[test]
fn task_failure_names_label_reason_and_log() {
    let err = TrainwatchError::TaskFailed {
        label: "model download".to_string(),
        reason: FailureReason::ErrorPatternMatched {
            line: "Error: 401 Unauthorized".to_string(),
        },
        log: Some(PathBuf::from("logs/download.log")),
    };

    assert_eq!(
        err.to_string(),
        "model download failed: error detected in log: Error: 401 Unauthorized (see log: logs/download.log)"
    );
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn training_failure_has_no_log_hint() {
    let err = TrainwatchError::TaskFailed {
        label: "training".to_string(),
        reason: FailureReason::NonZeroExit(3),
        log: None,
    };
    assert_eq!(err.to_string(), "training failed: exited with status 3");
}

#[test]
fn timeout_reason_mentions_the_limit() {
    let reason = FailureReason::Timeout {
        after: Duration::from_secs(2),
    };
    assert_eq!(reason.to_string(), "timed out after 2s");
}

#[test]
fn interrupt_exits_with_130() {
    assert_eq!(TrainwatchError::Interrupted.exit_code(), 130);
    assert_eq!(TrainwatchError::ConfigError("x".into()).exit_code(), 1);
}

#[test]
fn wrapped_errors_convert() {
    let io: TrainwatchError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(io, TrainwatchError::IoError(_)));

    let re: TrainwatchError = regex::Regex::new("(").unwrap_err().into();
    assert!(matches!(re, TrainwatchError::PatternError(_)));
    assert!(re.to_string().starts_with("Invalid pattern:"));

    let other: TrainwatchError = anyhow::anyhow!("something else").into();
    assert_eq!(other.to_string(), "something else");
}

#[test]
fn tie_break_parses_case_insensitively() {
    assert_eq!(TieBreak::from_str(" Error "), Ok(TieBreak::Error));
    assert_eq!(TieBreak::from_str("SUCCESS"), Ok(TieBreak::Success));
    assert!(TieBreak::from_str("both").is_err());
}
