// src/pipeline/steps/template.rs

use std::path::{Path, PathBuf};

use minijinja::{context, path_loader, Environment};

use crate::errors::{AssetdagError, Result};
use crate::mode::Mode;
use crate::pipeline::files::{Asset, FileSet};
use crate::pipeline::steps::Step;
use crate::watch::patterns::to_match_str;

/// Render pages with minijinja.
///
/// Pages are registered under their relative path; `{% include %}` and
/// `{% extends %}` fall back to files under the include root, so partials
/// can live anywhere below `src_root` without being pages themselves.
/// Templates see `mode`, `development` and `production`.
#[derive(Debug, Clone)]
pub struct TemplateStep {
    include_root: PathBuf,
    mode: Mode,
}

impl TemplateStep {
    pub fn new(include_root: impl AsRef<Path>, mode: Mode) -> Self {
        Self {
            include_root: include_root.as_ref().to_path_buf(),
            mode,
        }
    }
}

impl Step for TemplateStep {
    fn name(&self) -> &str {
        "template"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut env: Environment<'static> = Environment::new();
        env.set_loader(path_loader(self.include_root.clone()));
        env.set_keep_trailing_newline(true);

        let mut out = FileSet::new();
        for (rel, asset) in files {
            let (source, origin) = asset.into_text(self.name(), &rel)?;
            let template_name = to_match_str(&rel);

            let fail = |e: minijinja::Error| AssetdagError::transform("template", rel.display(), e);

            env.add_template_owned(template_name.clone(), source)
                .map_err(fail)?;
            let rendered = env
                .get_template(&template_name)
                .and_then(|tmpl| {
                    tmpl.render(context! {
                        mode => self.mode.as_str(),
                        development => self.mode == Mode::Development,
                        production => self.mode == Mode::Production,
                    })
                })
                .map_err(fail)?;

            out.insert(
                rel.with_extension("html"),
                Asset {
                    contents: rendered.into_bytes(),
                    origin,
                },
            );
        }
        Ok(out)
    }
}
