use crate::archive::build_archive_bytes;
use crate::cipher::{BundleCipher, Passphrase};
use crate::error::{CoreError, CoreResult};
use crate::hashing::sha256;
use crate::naming::{parse_csid, validate_pov_name, validate_rb_set, BundleName, Csid};
use crate::pipeline::{AtStage, SolutionPipeline, Stage, StageResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub csid: String,
    pub pov: PathBuf,
    pub rbs: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub csid: String,
    pub archive_sha256: String,
    pub package: PathBuf,
    /// Zero-length marker named after the package. Carries no secret; the
    /// integrity guarantee is the plaintext hash embedded in both names.
    pub commitment: PathBuf,
}

struct ValidatedInputs {
    csid: Csid,
    pov: (String, PathBuf),
    rbs: Vec<(String, PathBuf)>,
}

impl<C: BundleCipher> SolutionPipeline<C> {
    pub fn package(
        &self,
        req: &PackageRequest,
        passphrase: &Passphrase,
    ) -> StageResult<PackageOutcome> {
        let inputs = validate_inputs(req).at(Stage::ValidateInputs)?;
        tracing::info!(csid = %inputs.csid, rbs = inputs.rbs.len(), "submission inputs validated");

        if let Some(checker) = &self.binary_checker {
            for (_, path) in &inputs.rbs {
                checker.check(path).at(Stage::CheckBinaries)?;
            }
            tracing::info!(checker = checker.name(), files = inputs.rbs.len(), "binaries checked");
        }
        if let Some(checker) = &self.pov_checker {
            checker.check(&inputs.pov.1).at(Stage::CheckPov)?;
            tracing::info!(checker = checker.name(), "pov checked");
        }

        let mut members = Vec::with_capacity(inputs.rbs.len() + 1);
        members.push(inputs.pov.clone());
        members.extend(inputs.rbs.iter().cloned());
        let archive = build_archive_bytes(&members).at(Stage::BuildArchive)?;

        let digest = sha256(&archive);
        let name = BundleName::new(inputs.csid.clone(), digest);
        tracing::info!(csid = %inputs.csid, archive_sha256 = %hex::encode(digest), "archive built");

        let ciphertext = self
            .cipher
            .encrypt(&archive, passphrase)
            .at(Stage::Encrypt)?;

        let package = req.output_dir.join(name.package_file_name());
        let commitment = req.output_dir.join(name.commitment_file_name());
        write_outputs(&package, &ciphertext, &commitment).at(Stage::WriteOutputs)?;
        tracing::info!(
            package = %package.display(),
            commitment = %commitment.display(),
            "solution packaged"
        );

        Ok(PackageOutcome {
            csid: inputs.csid.to_string(),
            archive_sha256: hex::encode(digest),
            package,
            commitment,
        })
    }
}

fn validate_inputs(req: &PackageRequest) -> CoreResult<ValidatedInputs> {
    if !req.pov.is_file() {
        return Err(CoreError::resource(&req.pov, "cannot find PoV file"));
    }
    for rb in &req.rbs {
        if !rb.is_file() {
            return Err(CoreError::resource(rb, "cannot find replacement CB"));
        }
    }
    if !req.output_dir.is_dir() {
        return Err(CoreError::resource(&req.output_dir, "output directory not found"));
    }

    let csid = parse_csid(&req.csid)?;

    let mut named: Vec<(String, PathBuf)> = Vec::with_capacity(req.rbs.len());
    for rb in &req.rbs {
        named.push((file_name(rb)?, rb.clone()));
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));
    let names: Vec<&str> = named.iter().map(|(n, _)| n.as_str()).collect();
    validate_rb_set(&names, &csid)?;

    let pov_name = file_name(&req.pov)?;
    validate_pov_name(&pov_name, &csid)?;

    Ok(ValidatedInputs {
        csid,
        pov: (pov_name, req.pov.clone()),
        rbs: named,
    })
}

fn file_name(path: &Path) -> CoreResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CoreError::Naming(format!("{} has no usable file name", path.display()))
        })
}

fn write_outputs(package: &Path, ciphertext: &[u8], commitment: &Path) -> CoreResult<()> {
    fs::write(package, ciphertext).map_err(|e| CoreError::resource(package, e.to_string()))?;
    fs::File::create(commitment).map_err(|e| CoreError::resource(commitment, e.to_string()))?;
    Ok(())
}
