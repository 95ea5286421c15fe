// src/pipeline/steps/command.rs

//! Escape hatch: pipe each file through an external shell command.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use crate::errors::{AssetdagError, Result};
use crate::pipeline::files::{Asset, FileSet};
use crate::pipeline::steps::Step;
use crate::watch::patterns::to_match_str;

/// Run `cmd` once per file with the file on stdin; stdout replaces it.
///
/// The relative path is exported as `ASSETDAG_FILE`. With `extension` set,
/// the output file's extension is changed accordingly.
#[derive(Debug, Clone)]
pub struct CommandStep {
    cmd: String,
    extension: Option<String>,
}

impl CommandStep {
    pub fn new(cmd: impl Into<String>, extension: Option<String>) -> Self {
        Self {
            cmd: cmd.into(),
            extension,
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    fn pipe(&self, rel: &str, input: Vec<u8>) -> std::result::Result<Vec<u8>, String> {
        let mut child = self
            .shell()
            .env("ASSETDAG_FILE", rel)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("spawning `{}`: {e}", self.cmd))?;

        // stdin is written from its own thread; the child may block on a full
        // stdout pipe before it has read all of its input.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                let _ = stdin.write_all(&input);
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| format!("waiting for `{}`: {e}", self.cmd))?;
        if let Some(handle) = writer {
            let _ = handle.join();
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "`{}` exited with {}: {}",
                self.cmd,
                output.status,
                stderr.trim()
            ));
        }
        Ok(output.stdout)
    }
}

impl Step for CommandStep {
    fn name(&self) -> &str {
        "command"
    }

    fn apply(&self, files: FileSet) -> Result<FileSet> {
        let mut out = FileSet::new();
        for (rel, asset) in files {
            let rel_str = to_match_str(&rel);
            debug!(cmd = %self.cmd, file = %rel_str, "piping file through command");

            let contents = self
                .pipe(&rel_str, asset.contents)
                .map_err(|msg| AssetdagError::transform(self.name(), &rel_str, msg))?;

            let target = match &self.extension {
                Some(ext) => rel.with_extension(ext.trim_start_matches('.')),
                None => rel,
            };
            out.insert(
                target,
                Asset {
                    contents,
                    origin: asset.origin,
                },
            );
        }
        Ok(out)
    }
}
