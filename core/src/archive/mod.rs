//! Defensive reading of `ar` member containers.
//!
//! Nothing in an archive is trusted: names are listed and validated before any
//! byte is written, extraction goes into a caller-owned scratch directory, and
//! the directory is read back afterwards so the set of files that actually
//! landed on disk can be compared with the set that was validated.

use crate::error::{CoreError, CoreResult};
use crate::naming::{pov_name, validate_pov_name, validate_rb_set, Csid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub mod builder;

pub use builder::{build_archive, build_archive_bytes};

/// Resource limits applied while walking an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveLimits {
    pub max_members: usize,
    pub max_member_bytes: u64,
    pub max_name_len: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_members: 256,                    // 255 RBs + POV
            max_member_bytes: 256 * 1024 * 1024, // 256 MB
            max_name_len: 255,
        }
    }
}

/// Member names that passed the naming grammar, before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSet {
    pub pov: String,
    pub rbs: Vec<String>,
}

impl MemberSet {
    pub fn names(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.rbs.iter().cloned().collect();
        out.insert(self.pov.clone());
        out
    }
}

/// Files that were written by `extract_members`, as reported by the extractor.
#[derive(Debug, Clone)]
pub struct ExtractedMembers {
    pub root: PathBuf,
    pub names: Vec<String>,
}

/// Extracted, verified submission: absolute paths inside the scratch directory.
#[derive(Debug, Clone)]
pub struct ExtractedSubmission {
    pub pov: PathBuf,
    pub rbs: Vec<PathBuf>,
}

pub fn list_members<R: Read>(reader: R, limits: &ArchiveLimits) -> CoreResult<Vec<String>> {
    let mut archive = ar::Archive::new(reader);
    let mut names = Vec::new();
    while let Some(entry) = archive.next_entry() {
        let entry = entry.map_err(|e| structure_error("listing", e))?;
        let name = member_name(entry.header().identifier(), limits)?;
        if names.len() >= limits.max_members {
            return Err(CoreError::ArchiveStructure(format!(
                "archive has more than {} members",
                limits.max_members
            )));
        }
        names.push(name);
    }
    Ok(names)
}

/// Applies the naming grammar to listed (not yet extracted) member names.
pub fn validate_member_set<S: AsRef<str>>(names: &[S], csid: &Csid) -> CoreResult<MemberSet> {
    let mut sorted: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    sorted.sort();

    if sorted.len() < 2 {
        return Err(CoreError::Naming(format!(
            "expecting at least one PoV and one RB, archive lists {} member(s)",
            sorted.len()
        )));
    }
    let expected_pov = pov_name(csid);
    if !sorted.iter().any(|n| *n == expected_pov) {
        return Err(CoreError::Naming(format!(
            "archive has no PoV member {}",
            expected_pov
        )));
    }

    // "POV_" sorts before "RB_", so a well-formed listing starts with the PoV.
    let pov = sorted.remove(0);
    validate_pov_name(&pov, csid)?;
    let rbs = validate_rb_set(&sorted, csid)?;
    Ok(MemberSet { pov, rbs })
}

/// Writes every member into `scratch_dir`. Refuses unsafe names and members
/// that would overwrite an earlier one. On error the caller must discard the
/// scratch directory; nothing partial is returned.
pub fn extract_members<R: Read>(
    reader: R,
    scratch_dir: &Path,
    limits: &ArchiveLimits,
) -> CoreResult<ExtractedMembers> {
    let mut archive = ar::Archive::new(reader);
    let mut names = Vec::new();
    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| structure_error("extraction", e))?;
        let name = member_name(entry.header().identifier(), limits)?;
        if names.len() >= limits.max_members {
            return Err(CoreError::ArchiveStructure(format!(
                "archive has more than {} members",
                limits.max_members
            )));
        }
        let size = entry.header().size();
        if size > limits.max_member_bytes {
            return Err(CoreError::ArchiveStructure(format!(
                "member {} is {} bytes, limit is {}",
                name, size, limits.max_member_bytes
            )));
        }

        let target = scratch_dir.join(&name);
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    CoreError::ArchiveStructure(format!("duplicate member {}", name))
                } else {
                    CoreError::Io(e)
                }
            })?;
        let written = io::copy(&mut entry, &mut out)
            .map_err(|e| structure_error("extraction", e))?;
        if written != size {
            return Err(CoreError::ArchiveStructure(format!(
                "member {} truncated: header says {} bytes, read {}",
                name, size, written
            )));
        }
        names.push(name);
    }
    tracing::debug!(members = names.len(), dir = %scratch_dir.display(), "archive extracted");
    Ok(ExtractedMembers {
        root: scratch_dir.to_path_buf(),
        names,
    })
}

/// Reads `extracted_root` back from disk and requires its file set to equal
/// the validated member set exactly.
pub fn verify_extracted_set(
    expected: &MemberSet,
    extracted_root: &Path,
) -> CoreResult<ExtractedSubmission> {
    let mut actual: BTreeSet<String> = BTreeSet::new();
    for e in WalkDir::new(extracted_root).min_depth(1) {
        let e = e.map_err(|err| CoreError::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        if !e.file_type().is_file() || e.depth() != 1 {
            return Err(CoreError::ArchiveStructure(format!(
                "unexpected extracted entry {}",
                e.path().display()
            )));
        }
        actual.insert(e.file_name().to_string_lossy().into_owned());
    }

    let wanted = expected.names();
    if actual != wanted {
        let missing: Vec<&String> = wanted.difference(&actual).collect();
        let unexpected: Vec<&String> = actual.difference(&wanted).collect();
        return Err(CoreError::ArchiveStructure(format!(
            "extracted files do not match archive listing (missing {:?}, unexpected {:?})",
            missing, unexpected
        )));
    }

    Ok(ExtractedSubmission {
        pov: extracted_root.join(&expected.pov),
        rbs: expected.rbs.iter().map(|n| extracted_root.join(n)).collect(),
    })
}

pub fn extract_validated<R: Read>(
    reader: R,
    scratch_dir: &Path,
    expected: &MemberSet,
    limits: &ArchiveLimits,
) -> CoreResult<ExtractedSubmission> {
    extract_members(reader, scratch_dir, limits)?;
    verify_extracted_set(expected, scratch_dir)
}

fn member_name(identifier: &[u8], limits: &ArchiveLimits) -> CoreResult<String> {
    let name = std::str::from_utf8(identifier).map_err(|_| {
        CoreError::ArchiveStructure(format!(
            "member name is not valid UTF-8: {}",
            String::from_utf8_lossy(identifier)
        ))
    })?;
    if name.is_empty() || name.len() > limits.max_name_len {
        return Err(CoreError::ArchiveStructure(format!(
            "member name length {} outside 1..={}",
            name.len(),
            limits.max_name_len
        )));
    }
    if name == "." || name == ".." || name.contains(&['/', '\\', '\0'][..]) {
        return Err(CoreError::ArchiveStructure(format!(
            "unsafe member name {:?}",
            name
        )));
    }
    Ok(name.to_string())
}

fn structure_error(phase: &str, e: io::Error) -> CoreError {
    CoreError::ArchiveStructure(format!("malformed archive during {}: {}", phase, e))
}
