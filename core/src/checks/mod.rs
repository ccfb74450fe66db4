use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

/// Per-file format check run before packaging (binary format, PoV schema).
pub trait FileChecker {
    fn name(&self) -> &str;

    fn check(&self, path: &Path) -> CoreResult<()>;
}

/// Runs `<program> [args..] <path>` and treats any non-zero exit as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandChecker {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandChecker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Binary format checker shipped with the challenge tooling.
    pub fn binary_format() -> Self {
        Self::new("cgcef_verify")
    }

    /// PoV XML schema checker shipped with the challenge tooling.
    pub fn pov_schema() -> Self {
        Self::new("poll-validate")
    }
}

impl FileChecker for CommandChecker {
    fn name(&self) -> &str {
        &self.program
    }

    fn check(&self, path: &Path) -> CoreResult<()> {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(path.display().to_string());
        let command = parts.join(" ");

        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CoreError::ExternalTool {
                command: command.clone(),
                status: None,
                stderr: e.to_string(),
            })?;
        if !out.status.success() {
            return Err(CoreError::ExternalTool {
                command,
                status: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        tracing::debug!(checker = %self.program, file = %path.display(), "check passed");
        Ok(())
    }
}
