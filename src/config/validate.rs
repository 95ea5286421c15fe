// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{
    BUILTIN_TASKS, ConfigFile, KNOWN_BROWSERS, PipelineConfig, RawConfigFile, StepKind,
};
use crate::errors::{AssetdagError, Result};
use crate::watch::patterns::compile_glob;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_names(cfg)?;
    for (name, pipeline) in cfg.pipeline.iter() {
        validate_pipeline(name, pipeline)?;
    }
    validate_task_members(cfg)?;
    validate_watch_bindings(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_empty() && cfg.task.is_empty() {
        return Err(config_error(
            "config must contain at least one [pipeline.<name>] or [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    // `clean` deletes build_root recursively, so refuse anything that could
    // take the sources (or the project) with it.
    let build = Path::new(&section.build_root);
    let src = Path::new(&section.src_root);

    if section.build_root.trim().is_empty() || build == Path::new(".") {
        return Err(config_error(
            "[config].build_root must name a subdirectory of the project",
        ));
    }
    if build.is_absolute()
        || build
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
    {
        return Err(config_error(format!(
            "[config].build_root must be a relative path inside the project (got {:?})",
            section.build_root
        )));
    }
    if src.starts_with(build) {
        return Err(config_error(format!(
            "[config].build_root {:?} contains src_root {:?}",
            section.build_root, section.src_root
        )));
    }

    for browser in section.targets.keys() {
        if !KNOWN_BROWSERS.contains(&browser.as_str()) {
            return Err(config_error(format!(
                "unknown browser '{}' in [config].targets (expected one of {:?})",
                browser, KNOWN_BROWSERS
            )));
        }
    }

    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.pipeline.keys().chain(cfg.task.keys()) {
        if BUILTIN_TASKS.contains(&name.as_str()) {
            return Err(config_error(format!(
                "'{}' is a built-in task and cannot be redefined",
                name
            )));
        }
    }
    for name in cfg.task.keys() {
        if cfg.pipeline.contains_key(name) {
            return Err(config_error(format!(
                "'{}' is defined both as [pipeline.{}] and [task.{}]",
                name, name, name
            )));
        }
    }
    Ok(())
}

fn validate_pipeline(name: &str, pipeline: &PipelineConfig) -> Result<()> {
    if pipeline.src.is_empty() {
        return Err(config_error(format!(
            "pipeline '{}' must list at least one `src` pattern",
            name
        )));
    }
    for pattern in pipeline.src.iter() {
        compile_glob(pattern).map_err(|e| {
            config_error(format!(
                "pipeline '{}' has invalid src pattern '{}': {}",
                name, pattern, e
            ))
        })?;
    }
    if pipeline.dest.trim().is_empty() {
        return Err(config_error(format!(
            "pipeline '{}' must set a non-empty `dest`",
            name
        )));
    }

    for step in pipeline.steps.iter() {
        match &step.kind {
            StepKind::Bundle { name: bundle } if bundle.trim().is_empty() => {
                return Err(config_error(format!(
                    "pipeline '{}': bundle step needs a non-empty `name`",
                    name
                )));
            }
            StepKind::Command { cmd, .. } if cmd.trim().is_empty() => {
                return Err(config_error(format!(
                    "pipeline '{}': command step needs a non-empty `cmd`",
                    name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_known(cfg: &RawConfigFile, name: &str) -> bool {
    cfg.pipeline.contains_key(name)
        || cfg.task.contains_key(name)
        || BUILTIN_TASKS.contains(&name)
}

fn validate_task_members(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let members = match (&task.series, &task.parallel) {
            (Some(list), None) | (None, Some(list)) => list,
            (Some(_), Some(_)) => {
                return Err(config_error(format!(
                    "task '{}' sets both `series` and `parallel`",
                    name
                )));
            }
            (None, None) => {
                return Err(config_error(format!(
                    "task '{}' must set `series` or `parallel`",
                    name
                )));
            }
        };

        if members.is_empty() {
            return Err(config_error(format!("task '{}' has no members", name)));
        }

        for member in members.iter() {
            let dep = member.name();
            if dep == name {
                return Err(config_error(format!(
                    "task '{}' cannot contain itself",
                    name
                )));
            }
            if !is_known(cfg, dep) {
                return Err(config_error(format!(
                    "task '{}' has unknown member '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_watch_bindings(cfg: &RawConfigFile) -> Result<()> {
    for binding in cfg.watch.iter() {
        compile_glob(&binding.pattern).map_err(|e| {
            config_error(format!(
                "invalid watch pattern '{}': {}",
                binding.pattern, e
            ))
        })?;
        if !is_known(cfg, &binding.task) {
            return Err(config_error(format!(
                "watch pattern '{}' is bound to unknown task '{}'",
                binding.pattern, binding.task
            )));
        }
        if let Some(long_lived) = reaches_long_lived(cfg, &binding.task) {
            return Err(config_error(format!(
                "watch pattern '{}' is bound to task '{}', which runs '{}'; \
                 a file change must not start another watcher or server",
                binding.pattern, binding.task, long_lived
            )));
        }
    }
    Ok(())
}

/// Built-ins that run until the process exits.
const LONG_LIVED: [&str; 2] = ["watch", "serve"];

/// First of `watch`/`serve` reachable from `task` through composition
/// members, mode tags ignored.
fn reaches_long_lived<'a>(cfg: &'a RawConfigFile, task: &'a str) -> Option<&'a str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![task];
    while let Some(name) = stack.pop() {
        if !seen.insert(name) {
            continue;
        }
        if let Some(builtin) = LONG_LIVED.iter().find(|b| **b == name) {
            return Some(*builtin);
        }
        if let Some(composition) = cfg.task.get(name) {
            stack.extend(composition.members().map(|m| m.name()));
        }
    }
    None
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: member -> composition. Mode tags are ignored here so a
    // cycle is rejected even if only one mode would walk into it.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    let names: HashSet<&str> = cfg
        .pipeline
        .keys()
        .chain(cfg.task.keys())
        .map(|s| s.as_str())
        .chain(BUILTIN_TASKS)
        .collect();
    for name in names {
        graph.add_node(name);
    }

    for (name, task) in cfg.task.iter() {
        for member in task.members() {
            graph.add_edge(member.name(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(AssetdagError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn rejects_build_root_containing_sources() {
        let err = parse(
            r#"
[config]
src_root = "build/src"
build_root = "build"

[pipeline.a]
asset = "page"
src = ["build/src/*.html"]
dest = "build"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("contains src_root")));
    }

    #[test]
    fn rejects_redefining_builtin() {
        let err = parse(
            r#"
[task.clean]
series = ["watch"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("built-in")));
    }

    #[test]
    fn rejects_unknown_browser_target() {
        let err = parse(
            r#"
[config]
targets = { netscape = 4 }

[task.a]
series = ["clean"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("netscape")));
    }

    #[test]
    fn rejects_series_and_parallel_together() {
        let err = parse(
            r#"
[task.a]
series = ["clean"]
parallel = ["serve"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("both")));
    }

    #[test]
    fn tagged_member_cycle_is_still_a_cycle() {
        let err = parse(
            r#"
[task.a]
series = [{ task = "b", when = "production" }]

[task.b]
series = ["a"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssetdagError::DagCycle(_)));
    }

    #[test]
    fn rejects_watch_binding_that_reaches_watch_or_serve() {
        let direct = parse(
            r#"
[task.default]
series = ["clean"]

[[watch]]
pattern = "src/**/*"
task = "serve"
"#,
        )
        .unwrap_err();
        assert!(matches!(direct, AssetdagError::ConfigError(ref m) if m.contains("runs 'serve'")));

        let nested = parse(
            r#"
[task.live]
parallel = ["watch", "serve"]

[task.default]
series = ["clean", { task = "live", when = "development" }]

[[watch]]
pattern = "src/**/*.html"
task = "default"
"#,
        )
        .unwrap_err();
        assert!(matches!(nested, AssetdagError::ConfigError(ref m) if m.contains("task 'default'")));
    }

    #[test]
    fn watch_binding_to_plain_composition_is_fine() {
        let cfg = parse(
            r#"
[task.rebuild]
series = ["clean"]

[[watch]]
pattern = "src/**/*"
task = "rebuild"
"#,
        )
        .unwrap();
        assert_eq!(cfg.watch.len(), 1);
    }
}
