use crate::archive::ArchiveLimits;
use crate::checks::CommandChecker;
use crate::cipher::OpensslCipher;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod credentials;

pub use credentials::Credentials;

/// External tools and limits used by the pipelines. Every field has a default,
/// so an absent config file and `{}` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub openssl: PathBuf,
    pub cipher: String,
    pub message_digest: Option<String>,
    /// `None` skips the check.
    pub binary_checker: Option<CommandChecker>,
    pub pov_checker: Option<CommandChecker>,
    pub archive_limits: ArchiveLimits,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            openssl: PathBuf::from("openssl"),
            cipher: "aes-256-cbc".to_string(),
            message_digest: None,
            binary_checker: Some(CommandChecker::binary_format()),
            pov_checker: Some(CommandChecker::pov_schema()),
            archive_limits: ArchiveLimits::default(),
        }
    }
}

impl ToolConfig {
    pub fn load(path: &Path) -> CoreResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| CoreError::resource(path, e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn cipher(&self) -> OpensslCipher {
        let c = OpensslCipher::new(self.openssl.clone(), self.cipher.clone());
        match &self.message_digest {
            Some(md) => c.with_message_digest(md.clone()),
            None => c,
        }
    }
}
