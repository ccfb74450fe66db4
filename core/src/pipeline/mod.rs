//! Producer (`package`) and consumer (`verify`) paths over the naming,
//! hashing, cipher, archive and identifier components.
//!
//! Both paths run strictly in order and stop at the first failing stage. The
//! error that stopped them is returned unchanged inside a [`StageFailure`] so
//! callers can report where the run died.

use crate::archive::ArchiveLimits;
use crate::checks::FileChecker;
use crate::cipher::{BundleCipher, OpensslCipher};
use crate::config::ToolConfig;
use crate::error::CoreError;
use std::fmt;

pub mod package;
pub mod scratch;
pub mod verify;

pub use package::{PackageOutcome, PackageRequest};
pub use verify::{VerifyReport, VerifyRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    // producer
    ValidateInputs,
    CheckBinaries,
    CheckPov,
    BuildArchive,
    HashArchive,
    Encrypt,
    WriteOutputs,
    // consumer
    ParseName,
    Decrypt,
    VerifyHash,
    ListMembers,
    ValidateNaming,
    Extract,
    VerifyExtractedSet,
    Copy,
    ComputeIdentifiers,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: CoreError,
}

impl StageFailure {
    pub fn new(stage: Stage, error: CoreError) -> Self {
        tracing::error!(stage = %stage, error = %error, "pipeline stage failed");
        Self { stage, error }
    }
}

pub type StageResult<T> = Result<T, StageFailure>;

pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> StageResult<T>;
}

impl<T> AtStage<T> for Result<T, CoreError> {
    fn at(self, stage: Stage) -> StageResult<T> {
        self.map_err(|e| StageFailure::new(stage, e))
    }
}

pub struct SolutionPipeline<C: BundleCipher> {
    cipher: C,
    binary_checker: Option<Box<dyn FileChecker>>,
    pov_checker: Option<Box<dyn FileChecker>>,
    limits: ArchiveLimits,
}

impl<C: BundleCipher> SolutionPipeline<C> {
    /// Pipeline with no external format checkers and default archive limits.
    pub fn new(cipher: C) -> Self {
        Self {
            cipher,
            binary_checker: None,
            pov_checker: None,
            limits: ArchiveLimits::default(),
        }
    }

    pub fn with_binary_checker(mut self, checker: impl FileChecker + 'static) -> Self {
        self.binary_checker = Some(Box::new(checker));
        self
    }

    pub fn with_pov_checker(mut self, checker: impl FileChecker + 'static) -> Self {
        self.pov_checker = Some(Box::new(checker));
        self
    }

    pub fn with_limits(mut self, limits: ArchiveLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl SolutionPipeline<OpensslCipher> {
    pub fn from_config(cfg: &ToolConfig) -> Self {
        let mut p = SolutionPipeline::new(cfg.cipher()).with_limits(cfg.archive_limits);
        if let Some(c) = &cfg.binary_checker {
            p = p.with_binary_checker(c.clone());
        }
        if let Some(c) = &cfg.pov_checker {
            p = p.with_pov_checker(c.clone());
        }
        p
    }
}
