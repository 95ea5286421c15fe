// src/config/builtin.rs

//! Configuration used when the project has no `Assetdag.toml`.
//!
//! Layout:
//!
//! ```text
//! src/*.html             -> build/*.html             (pages)
//! src/styles/**/*.scss   -> build/assets/css/        (styles)
//! src/images/**/*        -> build/assets/images/     (images)
//! src/fonts/**/*         -> build/assets/fonts/      (fonts)
//! src/scripts/**/*.js    -> build/assets/scripts/    (scripts, one vendor.js)
//! ```

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

pub const BUILTIN_CONFIG: &str = r#"
[config]
src_root = "src"
build_root = "build"
host = "127.0.0.1"
port = 3000

[pipeline.pages]
asset = "page"
src = ["src/*.html"]
dest = "build"
steps = [{ kind = "template" }]

[pipeline.styles]
asset = "style"
src = ["src/styles/**/*.scss"]
dest = "build/assets/css"
steps = [
  { kind = "scss" },
  { kind = "autoprefix" },
  { kind = "minify-css", when = "production" },
  { kind = "source-map", when = "development" },
]

[pipeline.images]
asset = "image"
src = ["src/images/**/*"]
dest = "build/assets/images"

[pipeline.fonts]
asset = "font"
src = ["src/fonts/**/*"]
dest = "build/assets/fonts"

[pipeline.scripts]
asset = "script"
src = ["src/scripts/**/*.js"]
dest = "build/assets/scripts"
steps = [
  { kind = "bundle", name = "vendor.js" },
  { kind = "minify-js", when = "production" },
]

[task.build]
series = ["clean", "pages", "styles", "images", "fonts", "scripts"]

[task.live]
parallel = ["watch", "serve"]

[task.default]
series = ["build", { task = "live", when = "development" }]

[[watch]]
pattern = "src/**/*.html"
task = "pages"

[[watch]]
pattern = "src/scripts/**/*.js"
task = "scripts"

[[watch]]
pattern = "src/styles/**/*.scss"
task = "styles"

[[watch]]
pattern = "src/images/**/*"
task = "images"

[[watch]]
pattern = "src/fonts/**/*"
task = "fonts"
"#;

impl ConfigFile {
    /// Parse and validate [`BUILTIN_CONFIG`].
    pub fn builtin() -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(BUILTIN_CONFIG)?;
        ConfigFile::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::StepKind;
    use crate::types::ModeTag;

    #[test]
    fn builtin_config_is_valid() {
        let cfg = ConfigFile::builtin().unwrap();
        assert_eq!(cfg.pipeline.len(), 5);
        assert_eq!(cfg.watch.len(), 5);
        assert!(cfg.task.contains_key("default"));
    }

    #[test]
    fn builtin_styles_tag_optional_steps() {
        let cfg = ConfigFile::builtin().unwrap();
        let styles = &cfg.pipeline["styles"];
        let tagged: Vec<_> = styles
            .steps
            .iter()
            .filter_map(|s| s.when.map(|w| (s.kind.label(), w)))
            .collect();
        assert_eq!(
            tagged,
            vec![
                ("minify-css", ModeTag::Production),
                ("source-map", ModeTag::Development)
            ]
        );
        assert_eq!(styles.steps[0].kind, StepKind::Scss);
    }
}
