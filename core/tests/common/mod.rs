#![allow(dead_code)]

use cqe_core::checks::FileChecker;
use cqe_core::cipher::{BundleCipher, Passphrase};
use cqe_core::error::{CoreError, CoreResult};
use cqe_core::hashing::sha256;
use cqe_core::pipeline::SolutionPipeline;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"MOCKENC1";

/// Reversible stand-in for the openssl CLI: magic, 8-byte passphrase tag,
/// then the plaintext XORed with the passphrase. A wrong passphrase fails the
/// way `openssl -d` does ("bad decrypt", exit 1).
#[derive(Debug, Clone, Default)]
pub struct MockCipher;

impl MockCipher {
    fn tag(passphrase: &Passphrase) -> [u8; 8] {
        let d = sha256(passphrase.expose().as_bytes());
        let mut out = [0u8; 8];
        out.copy_from_slice(&d[..8]);
        out
    }

    fn xor(data: &[u8], passphrase: &Passphrase) -> Vec<u8> {
        let key = passphrase.expose().as_bytes();
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i % key.len()])
            .collect()
    }
}

impl BundleCipher for MockCipher {
    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&Self::tag(passphrase));
        out.extend(Self::xor(plaintext, passphrase));
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &Path, passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        let data = std::fs::read(ciphertext)?;
        if data.len() < 16 || &data[..8] != MAGIC || data[8..16] != Self::tag(passphrase) {
            return Err(CoreError::ExternalTool {
                command: "mock-cipher -d".to_string(),
                status: Some(1),
                stderr: "bad decrypt".to_string(),
            });
        }
        Ok(Self::xor(&data[16..], passphrase))
    }
}

/// Fails for one file name, passes everything else.
pub struct MockChecker {
    pub program: String,
    pub reject: Option<String>,
}

impl MockChecker {
    pub fn passing(program: &str) -> Self {
        Self {
            program: program.to_string(),
            reject: None,
        }
    }

    pub fn rejecting(program: &str, file_name: &str) -> Self {
        Self {
            program: program.to_string(),
            reject: Some(file_name.to_string()),
        }
    }
}

impl FileChecker for MockChecker {
    fn name(&self) -> &str {
        &self.program
    }

    fn check(&self, path: &Path) -> CoreResult<()> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.reject.as_deref() == Some(name.as_str()) {
            return Err(CoreError::ExternalTool {
                command: format!("{} {}", self.program, path.display()),
                status: Some(3),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

pub fn passphrase() -> Passphrase {
    Passphrase::new("correct horse battery staple")
}

pub fn pipeline() -> SolutionPipeline<MockCipher> {
    SolutionPipeline::new(MockCipher)
        .with_binary_checker(MockChecker::passing("cgcef_verify"))
        .with_pov_checker(MockChecker::passing("poll-validate"))
}

pub const POV_XML: &[u8] = b"<?xml version=\"1.0\" standalone=\"no\" ?>\n\
<!DOCTYPE pov SYSTEM \"/usr/share/cgc-replay/replay.dtd\">\n\
<pov><cbid>service</cbid><replay><write><data>AAAA</data></write></replay></pov>\n";

pub fn rb_bytes(index: u8) -> Vec<u8> {
    let mut b = b"\x7fCGC\x01\x01\x01\x43\x01".to_vec();
    b.extend(std::iter::repeat(index).take(64 + usize::from(index)));
    b
}

/// Writes `POV_<csid>.xml` and `RB_<csid>_01..count` into `dir`.
pub fn write_submission(dir: &Path, csid: &str, count: u8) -> (PathBuf, Vec<PathBuf>) {
    let pov = dir.join(format!("POV_{}.xml", csid));
    std::fs::write(&pov, POV_XML).unwrap();
    let mut rbs = Vec::new();
    for i in 1..=count {
        let p = dir.join(format!("RB_{}_{:02x}", csid, i));
        std::fs::write(&p, rb_bytes(i)).unwrap();
        rbs.push(p);
    }
    (pov, rbs)
}
