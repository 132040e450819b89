#![allow(dead_code)]

use std::path::{Path, PathBuf};

use trainwatch::config::{
    ConfigFile, ConfigSection, DatasetSection, RawConfigFile, TaskConfig, TrainingSection,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    poll_interval: "100ms".to_string(),
                    relay_interval: "50ms".to_string(),
                    watch_interval: "100ms".to_string(),
                    kill_grace: "1s".to_string(),
                    ..ConfigSection::default()
                },
                dataset: None,
                task: Vec::new(),
                training: None,
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_training(mut self, training: TrainingSection) -> Self {
        self.config.training = Some(training);
        self
    }

    pub fn with_dataset(mut self, path: impl AsRef<Path>, require_captions: bool) -> Self {
        self.config.dataset = Some(DatasetSection {
            path: path.as_ref().to_path_buf(),
            require_captions,
        });
        self
    }

    pub fn settle(mut self, val: bool) -> Self {
        self.config.config.settle = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(label: &str, cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                label: label.to_string(),
                cmd: cmd.to_string(),
                log: None,
                timeout: "10s".to_string(),
                error_pattern: None,
                success_pattern: None,
            },
        }
    }

    pub fn log(mut self, path: impl AsRef<Path>) -> Self {
        self.task.log = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.task.timeout = duration.to_string();
        self
    }

    pub fn error_pattern(mut self, pattern: &str) -> Self {
        self.task.error_pattern = Some(pattern.to_string());
        self
    }

    pub fn success_pattern(mut self, pattern: &str) -> Self {
        self.task.success_pattern = Some(pattern.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `TrainingSection`.
pub struct TrainingBuilder {
    training: TrainingSection,
}

impl TrainingBuilder {
    pub fn new(cmd: &str, output_root: impl Into<PathBuf>, run_name: &str) -> Self {
        Self {
            training: TrainingSection {
                cmd: cmd.to_string(),
                output_root: output_root.into(),
                run_name: run_name.to_string(),
                artifact: "adapter_model.safetensors".to_string(),
                archive: true,
            },
        }
    }

    pub fn artifact(mut self, name: &str) -> Self {
        self.training.artifact = name.to_string();
        self
    }

    pub fn archive(mut self, val: bool) -> Self {
        self.training.archive = val;
        self
    }

    pub fn build(self) -> TrainingSection {
        self.training
    }
}
