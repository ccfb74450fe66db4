use crate::cipher::Passphrase;
use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Credentials file handed out by the event organisers. Only
/// `cqe_encryption_key` is used here; the rest belongs to the object-store
/// transfer scripts.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_id: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub distribution_bucket: String,
    #[serde(default)]
    pub submission_bucket: String,
    pub cqe_encryption_key: String,
}

impl Credentials {
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::resource(path, "cannot find credentials file"));
        }
        let bytes = std::fs::read(path).map_err(|e| CoreError::resource(path, e.to_string()))?;
        let creds: Credentials = serde_json::from_slice(&bytes)?;
        if creds.cqe_encryption_key.is_empty() {
            return Err(CoreError::InvalidInput(
                "credentials file has an empty cqe_encryption_key".to_string(),
            ));
        }
        Ok(creds)
    }

    pub fn passphrase(&self) -> Passphrase {
        Passphrase::new(self.cqe_encryption_key.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .field("distribution_bucket", &self.distribution_bucket)
            .field("submission_bucket", &self.submission_bucket)
            .field("cqe_encryption_key", &"<redacted>")
            .finish()
    }
}
