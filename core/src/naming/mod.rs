//! File-name grammar for challenge sets, replacement binaries, proofs of
//! vulnerability and encrypted submission bundles.
//!
//! Every function here is pure: names in, typed value or `CoreError::Naming` out.

use crate::error::{CoreError, CoreResult};
use crate::hashing::{parse_sha256_hex, Sha256Digest};
use regex::Regex;
use std::fmt;

pub const PACKAGE_EXTENSION: &str = ".ar.enc";
pub const COMMITMENT_EXTENSION: &str = ".txt";

const CSID_PATTERN: &str = r"^[0-9a-f]{8}$";
const BUNDLE_PATTERN: &str = r"^([0-9a-f]{8})_([0-9a-f]{64})\.ar\.enc$";
const COMMITMENT_PATTERN: &str = r"^([0-9a-f]{8})_([0-9a-f]{64})\.txt$";

/// Challenge-set identifier. The last byte encodes the number of
/// replacement binaries a solution must carry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Csid {
    text: String,
    expected_count: u8,
}

impl Csid {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn expected_count(&self) -> u8 {
        self.expected_count
    }
}

impl fmt::Display for Csid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub fn parse_csid(s: &str) -> CoreResult<Csid> {
    let re = compile(CSID_PATTERN)?;
    if !re.is_match(s) {
        return Err(CoreError::Naming(format!(
            "CSID is not in the correct format: {:?}",
            s
        )));
    }
    let expected_count = u8::from_str_radix(&s[6..8], 16)
        .map_err(|e| CoreError::Naming(format!("CSID count byte unreadable: {}", e)))?;
    if expected_count < 1 {
        return Err(CoreError::Naming(format!(
            "CSID {} encodes a replacement binary count of 0",
            s
        )));
    }
    Ok(Csid {
        text: s.to_string(),
        expected_count,
    })
}

pub fn rb_name(csid: &Csid, index: u8) -> String {
    format!("RB_{}_{:02x}", csid, index)
}

pub fn pov_name(csid: &Csid) -> String {
    format!("POV_{}.xml", csid)
}

/// `index` is 1-based and must fall within the CSID's expected count.
pub fn validate_rb_name(name: &str, csid: &Csid, index: u8) -> CoreResult<()> {
    if index == 0 || index > csid.expected_count() {
        return Err(CoreError::Naming(format!(
            "replacement binary index {} outside 1..={} for CSID {}",
            index,
            csid.expected_count(),
            csid
        )));
    }
    let expected = rb_name(csid, index);
    if name != expected {
        return Err(CoreError::Naming(format!(
            "replacement binary incorrectly named. Expected {}, got {}",
            expected, name
        )));
    }
    Ok(())
}

pub fn validate_pov_name(name: &str, csid: &Csid) -> CoreResult<()> {
    let expected = pov_name(csid);
    if name != expected {
        return Err(CoreError::Naming(format!(
            "PoV incorrectly named. Expected {}, got {}",
            expected, name
        )));
    }
    Ok(())
}

/// Sorts `names` and checks that they are exactly `RB_<csid>_01..N`.
/// Returns the sorted list.
pub fn validate_rb_set<S: AsRef<str>>(names: &[S], csid: &Csid) -> CoreResult<Vec<String>> {
    let mut sorted: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    sorted.sort();

    let expected = usize::from(csid.expected_count());
    if sorted.len() != expected {
        return Err(CoreError::Naming(format!(
            "incorrect number of replacement binaries: expected {}, got {}",
            expected,
            sorted.len()
        )));
    }
    for (i, name) in sorted.iter().enumerate() {
        // len == expected_count <= 255, so i + 1 fits
        validate_rb_name(name, csid, (i + 1) as u8)?;
    }
    Ok(sorted)
}

/// Parsed `<csid>_<sha256>` prefix shared by an encrypted package and its
/// commitment marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleName {
    pub csid: Csid,
    pub archive_sha256: Sha256Digest,
}

impl BundleName {
    pub fn new(csid: Csid, archive_sha256: Sha256Digest) -> Self {
        Self {
            csid,
            archive_sha256,
        }
    }

    pub fn stem(&self) -> String {
        format!("{}_{}", self.csid, hex::encode(self.archive_sha256))
    }

    pub fn package_file_name(&self) -> String {
        format!("{}{}", self.stem(), PACKAGE_EXTENSION)
    }

    pub fn commitment_file_name(&self) -> String {
        format!("{}{}", self.stem(), COMMITMENT_EXTENSION)
    }
}

pub fn parse_bundle_filename(name: &str) -> CoreResult<BundleName> {
    parse_stem(name, BUNDLE_PATTERN, "bundle")
}

pub fn parse_commitment_filename(name: &str) -> CoreResult<BundleName> {
    parse_stem(name, COMMITMENT_PATTERN, "commitment file")
}

fn parse_stem(name: &str, pattern: &str, what: &str) -> CoreResult<BundleName> {
    let re = compile(pattern)?;
    let caps = re.captures(name).ok_or_else(|| {
        CoreError::Naming(format!("{} name is not in the correct format: {}", what, name))
    })?;
    let csid = parse_csid(&caps[1])?;
    let archive_sha256 = parse_sha256_hex(&caps[2])
        .map_err(|e| CoreError::Naming(format!("{} name hash unreadable: {}", what, e)))?;
    Ok(BundleName::new(csid, archive_sha256))
}

fn compile(pattern: &str) -> CoreResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| CoreError::InvalidInput(format!("grammar regex failed to compile: {}", e)))
}
