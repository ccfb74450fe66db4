//! List identifiers: short aggregate fingerprints used to compare submissions
//! between parties without exchanging the full content.

use crate::error::{CoreError, CoreResult};
use crate::hashing::{sha256, sha256_file, Sha256Digest};
use crate::naming::Csid;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CANONICAL_DTD: &str = "/usr/share/cgc-docs/replay.dtd";
pub const LEGACY_DTD: &str = "/usr/share/cgc-replay/replay.dtd";

const CANONICAL_PREAMBLE: &str = concat!(
    "<?xml version=\"1.0\" standalone=\"no\" ?>\n",
    "<!DOCTYPE pov SYSTEM \"/usr/share/cgc-docs/replay.dtd\">\n"
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListIdentifier {
    pub csid: String,
    pub hex: String,
}

impl ListIdentifier {
    fn new(csid: &Csid, digest: &[u8]) -> Self {
        Self {
            csid: csid.to_string(),
            hex: hex::encode(digest),
        }
    }
}

impl fmt::Display for ListIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.csid, self.hex)
    }
}

/// Pins the PoV's DTD reference to the canonical path so that documents
/// written against either replay DTD location hash identically.
///
/// The first legacy path occurrence, if any, is rewritten to the canonical
/// path. If the canonical path is still absent afterwards, the canonical XML
/// preamble is prepended.
pub fn canonicalize_pov(content: &[u8]) -> Vec<u8> {
    let rewritten = match find(content, LEGACY_DTD.as_bytes()) {
        Some(at) => {
            let mut out = Vec::with_capacity(content.len() + CANONICAL_DTD.len());
            out.extend_from_slice(&content[..at]);
            out.extend_from_slice(CANONICAL_DTD.as_bytes());
            out.extend_from_slice(&content[at + LEGACY_DTD.len()..]);
            out
        }
        None => content.to_vec(),
    };
    if find(&rewritten, CANONICAL_DTD.as_bytes()).is_some() {
        return rewritten;
    }
    let mut out = Vec::with_capacity(CANONICAL_PREAMBLE.len() + rewritten.len());
    out.extend_from_slice(CANONICAL_PREAMBLE.as_bytes());
    out.extend_from_slice(&rewritten);
    out
}

pub fn pov_list_id(csid: &Csid, pov_content: &[u8]) -> ListIdentifier {
    let canonical = canonicalize_pov(pov_content);
    ListIdentifier::new(csid, &sha256(&canonical))
}

pub fn pov_list_id_file(csid: &Csid, pov_path: &Path) -> CoreResult<ListIdentifier> {
    let content =
        std::fs::read(pov_path).map_err(|e| CoreError::resource(pov_path, e.to_string()))?;
    Ok(pov_list_id(csid, &content))
}

/// XOR of equal-length digests. A single digest comes back unchanged.
///
/// Order does not matter, and two identical digests cancel out; the combiner is
/// kept as-is because published identifiers depend on it.
pub fn combine_digests<D: AsRef<[u8]>>(digests: &[D]) -> CoreResult<Sha256Digest> {
    let mut iter = digests.iter();
    let first = iter
        .next()
        .ok_or_else(|| CoreError::Digest("cannot combine an empty digest set".to_string()))?;
    let mut acc: Sha256Digest = first.as_ref().try_into().map_err(|_| {
        CoreError::Digest(format!(
            "digest length {} is not 32 bytes",
            first.as_ref().len()
        ))
    })?;
    for d in iter {
        let d = d.as_ref();
        if d.len() != acc.len() {
            return Err(CoreError::Digest(format!(
                "cannot combine digests of different lengths ({} vs {})",
                acc.len(),
                d.len()
            )));
        }
        for (a, b) in acc.iter_mut().zip(d) {
            *a ^= b;
        }
    }
    Ok(acc)
}

/// Hashes each replacement binary in ascending file-name order, one file at a
/// time, and XOR-combines the digests.
pub fn cb_list_id(csid: &Csid, rb_paths: &[PathBuf]) -> CoreResult<ListIdentifier> {
    let mut ordered: Vec<&PathBuf> = rb_paths.iter().collect();
    ordered.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut digests = Vec::with_capacity(ordered.len());
    for p in ordered {
        digests.push(sha256_file(p)?);
    }
    let combined = combine_digests(&digests)?;
    Ok(ListIdentifier::new(csid, &combined))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
