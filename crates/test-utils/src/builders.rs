#![allow(dead_code)]

use std::collections::BTreeMap;

use assetdag::config::{
    ConfigFile, ConfigSection, MemberSpec, PipelineConfig, RawConfigFile, StepConfig, StepKind,
    TaskConfig, WatchBindingConfig,
};
use assetdag::types::{AssetClass, ModeTag};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                pipeline: BTreeMap::new(),
                task: BTreeMap::new(),
                watch: Vec::new(),
            },
        }
    }

    pub fn build_root(mut self, dir: &str) -> Self {
        self.config.config.build_root = dir.to_string();
        self
    }

    pub fn src_root(mut self, dir: &str) -> Self {
        self.config.config.src_root = dir.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.config.port = port;
        self
    }

    pub fn with_pipeline(mut self, name: &str, pipeline: PipelineConfig) -> Self {
        self.config.pipeline.insert(name.to_string(), pipeline);
        self
    }

    pub fn with_series<M: Into<MemberSpec>>(mut self, name: &str, members: Vec<M>) -> Self {
        self.config
            .task
            .insert(name.to_string(), TaskConfig::series(members));
        self
    }

    pub fn with_parallel<M: Into<MemberSpec>>(mut self, name: &str, members: Vec<M>) -> Self {
        self.config
            .task
            .insert(name.to_string(), TaskConfig::parallel(members));
        self
    }

    pub fn with_watch(mut self, pattern: &str, task: &str) -> Self {
        self.config.watch.push(WatchBindingConfig {
            pattern: pattern.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// The raw, unvalidated config (for validation tests).
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

/// Builder for `PipelineConfig`.
pub struct PipelineBuilder {
    pipeline: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new(asset: AssetClass, dest: &str) -> Self {
        Self {
            pipeline: PipelineConfig {
                asset,
                src: Vec::new(),
                dest: dest.to_string(),
                steps: Vec::new(),
            },
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.pipeline.src.push(pattern.to_string());
        self
    }

    pub fn step(mut self, kind: StepKind) -> Self {
        self.pipeline.steps.push(StepConfig::always(kind));
        self
    }

    pub fn step_when(mut self, kind: StepKind, tag: ModeTag) -> Self {
        self.pipeline.steps.push(StepConfig::when(kind, tag));
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}

/// Tagged composition member, e.g. `member_when("live", ModeTag::Development)`.
pub fn member_when(task: &str, tag: ModeTag) -> MemberSpec {
    MemberSpec::Tagged {
        task: task.to_string(),
        when: Some(tag),
    }
}
