// src/pipeline/steps/styles.rs

//! Stylesheet steps: SCSS compilation (grass) and everything lightningcss
//! does for us afterwards (prefixing, minification, source maps).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::errors::{AssetdagError, Result};
use crate::pipeline::files::{Asset, FileSet};
use crate::pipeline::steps::{Step, has_extension};
use crate::watch::patterns::to_match_str;

/// Compile `.scss` files to CSS.
///
/// Partials (`_name.scss`) are only reachable through `@use`/`@import` and
/// never produce output of their own.
#[derive(Debug, Clone)]
pub struct ScssStep {
    src_root: PathBuf,
}

impl ScssStep {
    pub fn new(src_root: impl AsRef<Path>) -> Self {
        Self {
            src_root: src_root.as_ref().to_path_buf(),
        }
    }
}

impl Step for ScssStep {
    fn name(&self) -> &str {
        "scss"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (rel, asset) in files {
            if !has_extension(&rel, "scss") {
                out.insert(rel, asset);
                continue;
            }
            let is_partial = rel
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'));
            if is_partial {
                continue;
            }

            let (source, origin) = asset.into_text(self.name(), &rel)?;

            let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
            if let Some(dir) = origin.as_deref().and_then(Path::parent) {
                options = options.load_path(dir);
            }
            options = options.load_path(&self.src_root);

            let css = grass::from_string(source, &options)
                .map_err(|e| AssetdagError::transform(self.name(), rel.display(), e))?;

            out.insert(
                rel.with_extension("css"),
                Asset {
                    contents: css.into_bytes(),
                    origin,
                },
            );
        }
        Ok(out)
    }
}

/// Map `[config].targets` onto lightningcss browser versions.
pub fn browser_targets(targets: &BTreeMap<String, u32>) -> Targets {
    let mut browsers = Browsers::default();
    for (name, major) in targets {
        // lightningcss packs versions as major << 16 | minor << 8 | patch.
        let version = Some(major << 16);
        match name.as_str() {
            "android" => browsers.android = version,
            "chrome" => browsers.chrome = version,
            "edge" => browsers.edge = version,
            "firefox" => browsers.firefox = version,
            "ie" => browsers.ie = version,
            "ios_saf" => browsers.ios_saf = version,
            "opera" => browsers.opera = version,
            "safari" => browsers.safari = version,
            "samsung" => browsers.samsung = version,
            _ => {}
        }
    }
    Targets::from(browsers)
}

/// Parse, optimise for `targets`, print.
fn reprint(
    step: &str,
    rel: &Path,
    css: &str,
    targets: &BTreeMap<String, u32>,
    minify: bool,
) -> Result<String> {
    let fail = |e: String| AssetdagError::transform(step, rel.display(), e);

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: to_match_str(rel),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| fail(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets: browser_targets(targets),
            ..MinifyOptions::default()
        })
        .map_err(|e| fail(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets: browser_targets(targets),
            ..PrinterOptions::default()
        })
        .map_err(|e| fail(e.to_string()))?;

    Ok(printed.code)
}

fn map_css<F>(step: &str, files: FileSet, mut f: F) -> Result<FileSet>
where
    F: FnMut(&Path, &str) -> Result<String>,
{
    let mut out = FileSet::new();
    for (rel, asset) in files {
        if !has_extension(&rel, "css") {
            out.insert(rel, asset);
            continue;
        }
        let (css, origin) = asset.into_text(step, &rel)?;
        let code = f(&rel, &css)?;
        out.insert(
            rel,
            Asset {
                contents: code.into_bytes(),
                origin,
            },
        );
    }
    Ok(out)
}

/// Add vendor prefixes for the configured browsers, keeping the output readable.
#[derive(Debug, Clone)]
pub struct AutoprefixStep {
    targets: BTreeMap<String, u32>,
}

impl AutoprefixStep {
    pub fn new(targets: BTreeMap<String, u32>) -> Self {
        Self { targets }
    }
}

impl Step for AutoprefixStep {
    fn name(&self) -> &str {
        "autoprefix"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        map_css(self.name(), files, |rel, css| {
            reprint(self.name(), rel, css, &self.targets, false)
        })
    }
}

/// Minify every `.css` file.
#[derive(Debug, Clone)]
pub struct MinifyCssStep {
    targets: BTreeMap<String, u32>,
}

impl MinifyCssStep {
    pub fn new(targets: BTreeMap<String, u32>) -> Self {
        Self { targets }
    }
}

impl Step for MinifyCssStep {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        map_css(self.name(), files, |rel, css| {
            reprint(self.name(), rel, css, &self.targets, true)
        })
    }
}

/// Emit `<name>.css.map` next to every `.css` file and link it from the CSS.
///
/// The map points at the compiled CSS, not the SCSS it came from: grass does
/// not produce source maps, so `sourcesContent` holds the CSS as it reached
/// this step. The `sources` entry is the stylesheet's path below the source
/// root with a `.css` extension (`styles/main.css` for
/// `src/styles/main.scss`), or the output path when the origin is unknown.
#[derive(Debug, Clone)]
pub struct SourceMapStep {
    src_root: PathBuf,
}

impl SourceMapStep {
    pub fn new(src_root: impl AsRef<Path>) -> Self {
        Self {
            src_root: src_root.as_ref().to_path_buf(),
        }
    }

    fn source_name(&self, rel: &Path, origin: Option<&Path>) -> String {
        origin
            .and_then(|o| o.strip_prefix(&self.src_root).ok())
            .map(|o| to_match_str(&o.with_extension("css")))
            .unwrap_or_else(|| to_match_str(rel))
    }
}

impl Step for SourceMapStep {
    fn name(&self) -> &str {
        "source-map"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (rel, asset) in files {
            if !has_extension(&rel, "css") {
                out.insert(rel, asset);
                continue;
            }

            let (css, origin) = asset.into_text(self.name(), &rel)?;
            let fail = |e: String| AssetdagError::transform("source-map", rel.display(), e);
            let source_name = self.source_name(&rel, origin.as_deref());

            let mut source_map = SourceMap::new("/");
            source_map.add_source(&source_name);
            source_map
                .set_source_content(0, &css)
                .map_err(|e| fail(format!("{e:?}")))?;

            let sheet = StyleSheet::parse(
                &css,
                ParserOptions {
                    filename: source_name.clone(),
                    ..ParserOptions::default()
                },
            )
            .map_err(|e| fail(e.to_string()))?;

            let printed = sheet
                .to_css(PrinterOptions {
                    source_map: Some(&mut source_map),
                    ..PrinterOptions::default()
                })
                .map_err(|e| fail(e.to_string()))?;

            let map_json = source_map
                .to_json(None)
                .map_err(|e| fail(format!("{e:?}")))?;

            let file_name = rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let map_name = format!("{file_name}.map");
            let map_rel = rel.with_file_name(&map_name);

            let mut code = printed.code;
            if !code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str(&format!("/*# sourceMappingURL={map_name} */\n"));

            out.insert(map_rel, Asset::new(map_json));
            out.insert(
                rel,
                Asset {
                    contents: code.into_bytes(),
                    origin,
                },
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(rel: &str, contents: &str) -> FileSet {
        let mut files = FileSet::new();
        files.insert(rel, Asset::new(contents));
        files
    }

    fn text(set: &FileSet, rel: &str) -> String {
        String::from_utf8(set.get(rel).unwrap().contents.clone()).unwrap()
    }

    #[test]
    fn scss_compiles_and_drops_partials() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = single("main.scss", "$c: red;\n.a { .b { color: $c; } }\n");
        files.insert("_vars.scss", Asset::new("$x: 1;"));

        let out = ScssStep::new(dir.path()).apply(files).unwrap();
        assert_eq!(out.len(), 1);
        let css = text(&out, "main.css");
        assert!(css.contains(".a .b"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn invalid_scss_fails_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScssStep::new(dir.path())
            .apply(single("bad.scss", ".a { color: $missing; }"))
            .unwrap_err();
        assert!(matches!(err, AssetdagError::Transform { ref step, .. } if step == "scss"));
    }

    #[test]
    fn minify_strips_whitespace() {
        let out = MinifyCssStep::new(BTreeMap::new())
            .apply(single("a.css", ".a {\n  color: red;\n}\n"))
            .unwrap();
        assert_eq!(text(&out, "a.css"), ".a{color:red}");
    }

    #[test]
    fn autoprefix_adds_vendor_prefixes_for_old_targets() {
        let targets: BTreeMap<String, u32> = [("safari".to_string(), 6)].into_iter().collect();
        let out = AutoprefixStep::new(targets)
            .apply(single("a.css", ".a { user-select: none; }"))
            .unwrap();
        assert!(text(&out, "a.css").contains("-webkit-user-select"));
    }

    #[test]
    fn source_map_is_written_next_to_css() {
        let out = SourceMapStep::new("/src")
            .apply(single("main.css", ".a { color: red; }"))
            .unwrap();
        assert!(out.contains("main.css.map"));
        assert!(text(&out, "main.css").ends_with("/*# sourceMappingURL=main.css.map */\n"));
        assert!(text(&out, "main.css.map").contains("\"mappings\""));
    }

    #[test]
    fn source_map_names_the_compiled_css() {
        let mut files = FileSet::new();
        files.insert(
            "main.css",
            Asset::with_origin(".a { color: red; }", "/src/styles/main.scss"),
        );
        let out = SourceMapStep::new("/src").apply(files).unwrap();

        let map: serde_json::Value = serde_json::from_str(&text(&out, "main.css.map")).unwrap();
        let sources = map["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].as_str().unwrap().ends_with("styles/main.css"));
        assert!(map["sourcesContent"][0].as_str().unwrap().contains("color: red"));
        assert!(!text(&out, "main.css.map").contains(".scss"));
    }

    #[test]
    fn non_css_files_pass_through() {
        let input = single("logo.svg", "<svg/>");
        let out = MinifyCssStep::new(BTreeMap::new()).apply(input.clone()).unwrap();
        assert_eq!(out, input);
    }
}
