use crate::error::CoreResult;
use std::path::Path;
use tempfile::TempDir;

/// Private scratch space owned by a single verify run: one directory for the
/// decrypted archive, one for extracted members. Dropping it removes both, so
/// every early return releases them; `release` does the same on the success
/// path and surfaces removal errors.
#[derive(Debug)]
pub struct RunScratch {
    decrypted: TempDir,
    extracted: TempDir,
}

impl RunScratch {
    pub fn acquire() -> CoreResult<Self> {
        let decrypted = tempfile::Builder::new().prefix("cqe-decrypt-").tempdir()?;
        let extracted = tempfile::Builder::new().prefix("cqe-extract-").tempdir()?;
        tracing::debug!(
            decrypted = %decrypted.path().display(),
            extracted = %extracted.path().display(),
            "scratch acquired"
        );
        Ok(Self {
            decrypted,
            extracted,
        })
    }

    pub fn decrypted_dir(&self) -> &Path {
        self.decrypted.path()
    }

    pub fn extracted_dir(&self) -> &Path {
        self.extracted.path()
    }

    pub fn release(self) -> CoreResult<()> {
        let Self {
            decrypted,
            extracted,
        } = self;
        let first = decrypted.close();
        let second = extracted.close();
        first?;
        second?;
        tracing::debug!("scratch released");
        Ok(())
    }
}
