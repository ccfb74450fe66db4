use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub mod etag;

pub type Sha256Digest = [u8; 32];
pub type Md5Digest = [u8; 16];

const READ_BUF: usize = 8192;

pub fn sha256(bytes: &[u8]) -> Sha256Digest {
    let mut h = Sha256::new();
    h.update(bytes);
    h.finalize().into()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha256(bytes))
}

pub fn sha256_reader<R: Read>(mut reader: R) -> CoreResult<Sha256Digest> {
    let mut h = Sha256::new();
    let mut buf = [0u8; READ_BUF];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
    }
    Ok(h.finalize().into())
}

pub fn sha256_file(path: &Path) -> CoreResult<Sha256Digest> {
    let f = open_input(path)?;
    sha256_reader(f)
}

pub fn md5(bytes: &[u8]) -> Md5Digest {
    md5::compute(bytes).0
}

pub fn md5_reader<R: Read>(mut reader: R) -> CoreResult<Md5Digest> {
    let mut ctx = md5::Context::new();
    let mut buf = [0u8; READ_BUF];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(ctx.compute().0)
}

pub fn md5_file(path: &Path) -> CoreResult<Md5Digest> {
    let f = open_input(path)?;
    md5_reader(f)
}

pub fn parse_sha256_hex(s: &str) -> CoreResult<Sha256Digest> {
    let bytes = hex::decode(s)
        .map_err(|e| CoreError::Digest(format!("invalid sha256 hex {:?}: {}", s, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CoreError::Digest(format!("sha256 must be 32 bytes, got {}", b.len()))
    })
}

fn open_input(path: &Path) -> CoreResult<File> {
    File::open(path).map_err(|e| CoreError::resource(path, e.to_string()))
}
