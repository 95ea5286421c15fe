// src/pipeline/steps/scripts.rs

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use minify_js::{Session, TopLevelMode, minify};
use regex::Regex;
use tracing::debug;

use crate::errors::{AssetdagError, Result};
use crate::pipeline::files::{Asset, FileSet};
use crate::pipeline::steps::{Step, has_extension};
use crate::watch::patterns::to_match_str;

/// A line opening with a static `import` or an `export` declaration.
/// Dynamic `import(...)` is allowed in classic scripts and does not match.
static MODULE_SYNTAX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:import\b[ \t]*[\w{*"']|export\b[ \t]*[\w{*])"#).ok()
});

/// 1-based line of the first module statement in `source`, if any.
fn module_syntax_line(source: &str) -> Option<usize> {
    let found = MODULE_SYNTAX.as_ref()?.find(source)?;
    Some(source[..found.start()].matches('\n').count() + 1)
}

/// Concatenate every `.js` file into a single bundle.
///
/// Inputs are joined in path order, each preceded by a `/* <path> */`
/// marker. Anything that is not JavaScript passes through untouched.
///
/// The bundle is a classic script, so inputs using ES module `import` or
/// `export` are rejected: concatenation cannot link them. Module sources
/// belong in a `command` step driving a real bundler.
#[derive(Debug, Clone)]
pub struct BundleStep {
    name: PathBuf,
}

impl BundleStep {
    pub fn new(name: impl AsRef<Path>) -> Self {
        Self {
            name: name.as_ref().to_path_buf(),
        }
    }
}

impl Step for BundleStep {
    fn name(&self) -> &str {
        "bundle"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        let mut bundle = String::new();
        let mut parts = 0usize;

        for (rel, asset) in files {
            if !has_extension(&rel, "js") {
                out.insert(rel, asset);
                continue;
            }
            let (source, _) = asset.into_text(self.name(), &rel)?;
            if let Some(line) = module_syntax_line(&source) {
                return Err(AssetdagError::transform(
                    self.name(),
                    rel.display(),
                    format!(
                        "ES module syntax on line {line} cannot be concatenated into a classic script"
                    ),
                ));
            }
            bundle.push_str(&format!("/* {} */\n", to_match_str(&rel)));
            bundle.push_str(&source);
            if !source.ends_with('\n') {
                bundle.push('\n');
            }
            parts += 1;
        }

        if parts > 0 {
            debug!(bundle = ?self.name, parts, "bundled scripts");
            out.insert(self.name.clone(), Asset::new(bundle));
        }
        Ok(out)
    }
}

/// Minify every `.js` file.
///
/// Files containing `import`/`export` are minified as modules, everything
/// else as classic scripts sharing the global scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyJsStep;

impl Step for MinifyJsStep {
    fn name(&self) -> &str {
        "minify-js"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (rel, asset) in files {
            if !has_extension(&rel, "js") {
                out.insert(rel, asset);
                continue;
            }

            let top_level = match std::str::from_utf8(&asset.contents)
                .ok()
                .and_then(module_syntax_line)
            {
                Some(_) => TopLevelMode::Module,
                None => TopLevelMode::Global,
            };

            let session = Session::new();
            let mut minified = Vec::with_capacity(asset.contents.len());
            minify(
                &session,
                top_level,
                &asset.contents,
                &mut minified,
            )
            .map_err(|e| AssetdagError::transform(self.name(), rel.display(), format!("{e:?}")))?;

            out.insert(
                rel,
                Asset {
                    contents: minified,
                    origin: asset.origin,
                },
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(set: &FileSet, rel: &str) -> String {
        String::from_utf8(set.get(rel).unwrap().contents.clone()).unwrap()
    }

    #[test]
    fn bundle_joins_scripts_in_path_order() {
        let mut files = FileSet::new();
        files.insert("b.js", Asset::new("var b = 2;"));
        files.insert("a.js", Asset::new("var a = 1;\n"));
        files.insert("notes.md", Asset::new("# hi"));

        let out = BundleStep::new("vendor.js").apply(files).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains("notes.md"));
        assert_eq!(
            text(&out, "vendor.js"),
            "/* a.js */\nvar a = 1;\n/* b.js */\nvar b = 2;\n"
        );
    }

    #[test]
    fn bundle_without_scripts_emits_nothing() {
        let mut files = FileSet::new();
        files.insert("readme.txt", Asset::new("x"));
        let out = BundleStep::new("vendor.js").apply(files).unwrap();
        assert!(!out.contains("vendor.js"));
    }

    #[test]
    fn minify_shrinks_output() {
        let src = "function add(first, second) {\n    return first + second;\n}\nadd(1, 2);\n";
        let mut files = FileSet::new();
        files.insert("app.js", Asset::new(src));

        let out = MinifyJsStep.apply(files).unwrap();
        let min = text(&out, "app.js");
        assert!(min.len() < src.len());
        assert!(!min.contains('\n'));
    }

    #[test]
    fn minify_reports_syntax_errors() {
        let mut files = FileSet::new();
        files.insert("bad.js", Asset::new("function ("));
        let err = MinifyJsStep.apply(files).unwrap_err();
        assert!(matches!(err, AssetdagError::Transform { ref step, .. } if step == "minify-js"));
    }

    #[test]
    fn module_syntax_is_detected_by_line() {
        assert_eq!(module_syntax_line("var a = 1;\nimport { b } from './b.js';\n"), Some(2));
        assert_eq!(module_syntax_line("export const answer = 42;"), Some(1));
        assert_eq!(module_syntax_line("  export default function () {}"), Some(1));
        assert_eq!(module_syntax_line("import './side-effect.js';"), Some(1));
        assert_eq!(module_syntax_line("const m = import('./lazy.js');"), None);
        assert_eq!(module_syntax_line("var importantThing = 1;\nexporter();"), None);
    }

    #[test]
    fn bundle_rejects_es_modules() {
        let mut files = FileSet::new();
        files.insert(
            "app.js",
            Asset::new("import { answer } from './lib/util.js';\nconsole.log(answer);\n"),
        );
        files.insert("lib/util.js", Asset::new("export const answer = 42;\n"));

        let err = BundleStep::new("vendor.js").apply(files).unwrap_err();
        match err {
            AssetdagError::Transform { step, path, message } => {
                assert_eq!(step, "bundle");
                assert_eq!(path, "app.js");
                assert!(message.contains("line 1"));
            }
            other => panic!("expected Transform, got {other:?}"),
        }
    }

    #[test]
    fn minify_parses_module_sources_as_modules() {
        let src = "import { answer } from './lib/util.js';\nconst local = answer + 1;\nexport { local };\n";
        let mut files = FileSet::new();
        files.insert("app.js", Asset::new(src));

        let min = text(&MinifyJsStep.apply(files).unwrap(), "app.js");
        assert!(min.contains("./lib/util.js"));
        assert!(min.contains("export"));
        assert!(min.len() <= src.len());
    }
}
