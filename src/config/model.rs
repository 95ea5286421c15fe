// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{AssetClass, ModeTag, TaskName};

/// Names of the tasks every configuration gets for free.
///
/// - `clean` removes `[config].build_root`.
/// - `watch` starts the watch controller over the `[[watch]]` bindings.
/// - `serve` starts the dev server over `[config].build_root`.
pub const BUILTIN_TASKS: [&str; 3] = ["clean", "watch", "serve"];

/// Browser names accepted in `[config].targets`.
pub const KNOWN_BROWSERS: [&str; 9] = [
    "android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung",
];

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// build_root = "build"
///
/// [pipeline.images]
/// asset = "image"
/// src = ["src/images/**/*"]
/// dest = "build/assets/images"
///
/// [task.build]
/// series = ["clean", "images"]
///
/// [[watch]]
/// pattern = "src/images/**/*"
/// task = "images"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Pipelines from `[pipeline.<name>]`, keyed by task name.
    #[serde(default)]
    pub pipeline: BTreeMap<TaskName, PipelineConfig>,

    /// Compositions from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,

    /// `[[watch]]` bindings.
    #[serde(default)]
    pub watch: Vec<WatchBindingConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// every name it mentions resolves and the task graph is acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub pipeline: BTreeMap<TaskName, PipelineConfig>,
    pub task: BTreeMap<TaskName, TaskConfig>,
    pub watch: Vec<WatchBindingConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            pipeline: raw.pipeline,
            task: raw.task,
            watch: raw.watch,
        }
    }

    /// Whether `name` is a pipeline, a composition or a built-in task.
    pub fn is_known_task(&self, name: &str) -> bool {
        self.pipeline.contains_key(name)
            || self.task.contains_key(name)
            || BUILTIN_TASKS.contains(&name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Root of the source tree. Watched recursively; also the lookup root for
    /// template includes and SCSS imports.
    #[serde(default = "default_src_root")]
    pub src_root: String,

    /// Output tree removed by `clean` and served by `serve`.
    #[serde(default = "default_build_root")]
    pub build_root: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser targets for vendor prefixing: browser name -> major version.
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, u32>,
}

fn default_src_root() -> String {
    "src".to_string()
}

fn default_build_root() -> String {
    "build".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Oldest engines the stylesheets still have to work in ("ie 7", "ie 8"
/// plus a long tail of evergreen releases).
fn default_targets() -> BTreeMap<String, u32> {
    [
        ("android", 4),
        ("chrome", 49),
        ("edge", 12),
        ("firefox", 52),
        ("ie", 7),
        ("ios_saf", 9),
        ("opera", 36),
        ("safari", 9),
    ]
    .into_iter()
    .map(|(name, version)| (name.to_string(), version))
    .collect()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            src_root: default_src_root(),
            build_root: default_build_root(),
            host: default_host(),
            port: default_port(),
            targets: default_targets(),
        }
    }
}

/// `[pipeline.<name>]` section: select, transform, write.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Asset class announced to live-reload clients after a successful run.
    pub asset: AssetClass,

    /// Source globs, relative to the project root.
    pub src: Vec<String>,

    /// Destination directory, relative to the project root.
    pub dest: String,

    /// Ordered transformation steps. Empty means "copy".
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One entry of `steps = [...]`.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    #[serde(flatten)]
    pub kind: StepKind,

    /// Restrict the step to one mode; `None` means "always".
    #[serde(default)]
    pub when: Option<ModeTag>,
}

impl StepConfig {
    pub fn always(kind: StepKind) -> Self {
        Self { kind, when: None }
    }

    pub fn when(kind: StepKind, tag: ModeTag) -> Self {
        Self {
            kind,
            when: Some(tag),
        }
    }
}

/// Built-in step kinds, selected by `kind = "..."`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepKind {
    Template,
    Scss,
    Autoprefix,
    MinifyCss,
    SourceMap,
    Bundle {
        #[serde(default = "default_bundle_name")]
        name: String,
    },
    MinifyJs,
    Command {
        cmd: String,
        /// Replace the extension of every output file (e.g. `"js"`).
        #[serde(default)]
        extension: Option<String>,
    },
}

fn default_bundle_name() -> String {
    "vendor.js".to_string()
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Template => "template",
            StepKind::Scss => "scss",
            StepKind::Autoprefix => "autoprefix",
            StepKind::MinifyCss => "minify-css",
            StepKind::SourceMap => "source-map",
            StepKind::Bundle { .. } => "bundle",
            StepKind::MinifyJs => "minify-js",
            StepKind::Command { .. } => "command",
        }
    }
}

/// `[task.<name>]` section: exactly one of `series` / `parallel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub series: Option<Vec<MemberSpec>>,

    #[serde(default)]
    pub parallel: Option<Vec<MemberSpec>>,
}

impl TaskConfig {
    pub fn series<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberSpec>,
    {
        Self {
            series: Some(members.into_iter().map(Into::into).collect()),
            parallel: None,
        }
    }

    pub fn parallel<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberSpec>,
    {
        Self {
            series: None,
            parallel: Some(members.into_iter().map(Into::into).collect()),
        }
    }

    /// All members regardless of mode, in declaration order.
    pub fn members(&self) -> impl Iterator<Item = &MemberSpec> {
        self.series
            .iter()
            .chain(self.parallel.iter())
            .flat_map(|list| list.iter())
    }
}

/// A composition member: either a bare task name or `{ task, when }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MemberSpec {
    Name(TaskName),
    Tagged {
        task: TaskName,
        #[serde(default)]
        when: Option<ModeTag>,
    },
}

impl MemberSpec {
    pub fn name(&self) -> &str {
        match self {
            MemberSpec::Name(name) => name,
            MemberSpec::Tagged { task, .. } => task,
        }
    }

    pub fn when(&self) -> Option<ModeTag> {
        match self {
            MemberSpec::Name(_) => None,
            MemberSpec::Tagged { when, .. } => *when,
        }
    }
}

impl From<&str> for MemberSpec {
    fn from(name: &str) -> Self {
        MemberSpec::Name(name.to_string())
    }
}

impl From<String> for MemberSpec {
    fn from(name: String) -> Self {
        MemberSpec::Name(name)
    }
}

/// `[[watch]]` entry: rebuild `task` whenever a file matching `pattern` changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchBindingConfig {
    pub pattern: String,
    pub task: TaskName,
}
