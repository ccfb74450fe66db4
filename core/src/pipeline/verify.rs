use crate::archive::{
    extract_members, list_members, validate_member_set, verify_extracted_set, ExtractedSubmission,
};
use crate::cipher::{BundleCipher, Passphrase};
use crate::error::{CoreError, CoreResult};
use crate::hashing::sha256_file;
use crate::identifiers::{cb_list_id, pov_list_id_file, ListIdentifier};
use crate::naming::{parse_bundle_filename, BundleName};
use crate::pipeline::scratch::RunScratch;
use crate::pipeline::{AtStage, SolutionPipeline, Stage, StageResult};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub bundle: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub csid: String,
    pub archive_sha256: String,
    pub pov: PathBuf,
    pub rbs: Vec<PathBuf>,
    pub pov_list_id: ListIdentifier,
    pub cb_list_id: ListIdentifier,
}

impl<C: BundleCipher> SolutionPipeline<C> {
    pub fn verify(
        &self,
        req: &VerifyRequest,
        passphrase: &Passphrase,
    ) -> StageResult<VerifyReport> {
        let name = parse_name(&req.bundle).at(Stage::ParseName)?;
        tracing::info!(bundle = %req.bundle.display(), csid = %name.csid, "bundle name parsed");

        let scratch = RunScratch::acquire().at(Stage::Decrypt)?;
        let outcome = self.verify_in(req, passphrase, &name, &scratch);
        // Released on every path; a failed run keeps its original error.
        let released = scratch.release();
        let report = outcome?;
        released.at(Stage::Cleanup)?;
        Ok(report)
    }

    fn verify_in(
        &self,
        req: &VerifyRequest,
        passphrase: &Passphrase,
        name: &BundleName,
        scratch: &RunScratch,
    ) -> StageResult<VerifyReport> {
        let archive_path = scratch.decrypted_dir().join(format!("{}.ar", name.stem()));
        decrypt_into(&self.cipher, &req.bundle, passphrase, &archive_path).at(Stage::Decrypt)?;
        tracing::info!("bundle decrypted");

        // Nothing inside the archive is looked at until its hash matches.
        verify_archive_hash(&archive_path, name).at(Stage::VerifyHash)?;
        tracing::info!(archive_sha256 = %hex::encode(name.archive_sha256), "archive hash verified");

        let listed = open_archive(&archive_path)
            .and_then(|r| list_members(r, &self.limits))
            .at(Stage::ListMembers)?;
        let members = validate_member_set(&listed, &name.csid).at(Stage::ValidateNaming)?;
        tracing::info!(members = listed.len(), "archive member names validated");

        open_archive(&archive_path)
            .and_then(|r| extract_members(r, scratch.extracted_dir(), &self.limits))
            .at(Stage::Extract)?;
        let extracted = verify_extracted_set(&members, scratch.extracted_dir())
            .at(Stage::VerifyExtractedSet)?;
        tracing::info!("extracted set matches listing");

        let (pov, rbs) = copy_outputs(&req.output_dir, &extracted).at(Stage::Copy)?;
        tracing::info!(output_dir = %req.output_dir.display(), "submission copied");

        let pov_list_id = pov_list_id_file(&name.csid, &pov).at(Stage::ComputeIdentifiers)?;
        let cb_list_id = cb_list_id(&name.csid, &rbs).at(Stage::ComputeIdentifiers)?;
        tracing::info!(
            pov_list_id = %pov_list_id,
            cb_list_id = %cb_list_id,
            "list identifiers computed"
        );

        Ok(VerifyReport {
            csid: name.csid.to_string(),
            archive_sha256: hex::encode(name.archive_sha256),
            pov,
            rbs,
            pov_list_id,
            cb_list_id,
        })
    }
}

fn parse_name(bundle: &Path) -> CoreResult<BundleName> {
    let file_name = bundle
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CoreError::Naming(format!("{} has no usable file name", bundle.display()))
        })?;
    parse_bundle_filename(file_name)
}

fn decrypt_into<C: BundleCipher>(
    cipher: &C,
    bundle: &Path,
    passphrase: &Passphrase,
    archive_path: &Path,
) -> CoreResult<()> {
    if !bundle.is_file() {
        return Err(CoreError::resource(bundle, "cannot find solution bundle"));
    }
    let plaintext = cipher.decrypt(bundle, passphrase)?;
    fs::write(archive_path, plaintext)?;
    Ok(())
}

pub fn verify_archive_hash(archive_path: &Path, name: &BundleName) -> CoreResult<()> {
    let actual = sha256_file(archive_path)?;
    if actual != name.archive_sha256 {
        return Err(CoreError::HashMismatch {
            subject: name.package_file_name(),
            expected: hex::encode(name.archive_sha256),
            actual: hex::encode(actual),
        });
    }
    Ok(())
}

fn open_archive(path: &Path) -> CoreResult<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Copies every member into a staging directory inside `output_dir`, then
/// renames them into place. A failed copy leaves `output_dir` untouched.
fn copy_outputs(
    output_dir: &Path,
    extracted: &ExtractedSubmission,
) -> CoreResult<(PathBuf, Vec<PathBuf>)> {
    if !output_dir.is_dir() {
        return Err(CoreError::resource(output_dir, "output directory not found"));
    }
    let staging = tempfile::Builder::new()
        .prefix(".cqe-copy-")
        .tempdir_in(output_dir)
        .map_err(|e| CoreError::resource(output_dir, e.to_string()))?;

    let mut sources = vec![extracted.pov.as_path()];
    sources.extend(extracted.rbs.iter().map(PathBuf::as_path));
    let mut staged = Vec::with_capacity(sources.len());
    for src in sources {
        let file_name = src
            .file_name()
            .ok_or_else(|| CoreError::resource(src, "extracted member has no file name"))?;
        let tmp = staging.path().join(file_name);
        fs::copy(src, &tmp).map_err(|e| CoreError::resource(&tmp, e.to_string()))?;
        let dst = output_dir.join(file_name);
        if dst.is_dir() {
            return Err(CoreError::resource(&dst, "a directory is in the way"));
        }
        staged.push((tmp, dst));
    }

    let mut placed = Vec::with_capacity(staged.len());
    for (tmp, dst) in staged {
        fs::rename(&tmp, &dst).map_err(|e| CoreError::resource(&dst, e.to_string()))?;
        placed.push(dst);
    }
    staging
        .close()
        .map_err(|e| CoreError::resource(output_dir, e.to_string()))?;

    let pov = placed.remove(0);
    Ok((pov, placed))
}
