//! Checks run on a packaged submission before and after it is uploaded.

use crate::error::{CoreError, CoreResult};
use crate::hashing::etag::parse_etag;
use crate::hashing::md5_file;
use crate::naming::{parse_bundle_filename, parse_commitment_filename, BundleName};
use std::path::Path;

/// Both files exist, both names follow the grammar, and they share the same
/// `<csid>_<hash>` stem.
pub fn check_submission_pair(package: &Path, commitment: &Path) -> CoreResult<BundleName> {
    if !package.is_file() {
        return Err(CoreError::resource(package, "cannot find the encrypted package"));
    }
    if !commitment.is_file() {
        return Err(CoreError::resource(commitment, "cannot find the commitment file"));
    }
    check_submission_names(&base_name(package)?, &base_name(commitment)?)
}

/// Name-only variant of [`check_submission_pair`].
pub fn check_submission_names(package: &str, commitment: &str) -> CoreResult<BundleName> {
    let pkg = parse_bundle_filename(package)?;
    let com = parse_commitment_filename(commitment)?;
    if pkg != com {
        return Err(CoreError::Naming(format!(
            "commitment file and encrypted package must be named the same: {} vs {}",
            commitment, package
        )));
    }
    Ok(pkg)
}

/// Compares the local encrypted package with the content tag the object store
/// reports for the uploaded copy.
pub fn verify_uploaded(package: &Path, remote_etag: &str) -> CoreResult<()> {
    let remote = parse_etag(remote_etag)?;
    let local = md5_file(package)?;
    tracing::debug!(
        package = %package.display(),
        local_md5 = %hex::encode(local),
        remote_md5 = %hex::encode(remote),
        "comparing local package against remote content tag"
    );
    if local != remote {
        return Err(CoreError::HashMismatch {
            subject: package.display().to_string(),
            expected: hex::encode(remote),
            actual: hex::encode(local),
        });
    }
    Ok(())
}

fn base_name(path: &Path) -> CoreResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::Naming(format!("{} has no usable file name", path.display())))
}
