use crate::error::{CoreError, CoreResult};
use crate::hashing::Md5Digest;

// Object stores report single-part uploads with an ETag equal to the MD5 of the
// content, usually wrapped in double quotes. Multipart ETags ("<md5>-<n>") are
// not content digests and are rejected.
pub fn parse_etag(etag: &str) -> CoreResult<Md5Digest> {
    let trimmed = etag.trim().trim_matches('"');
    let bytes = hex::decode(trimmed.to_ascii_lowercase())
        .map_err(|e| CoreError::Digest(format!("ETag {:?} is not an MD5 digest: {}", etag, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CoreError::Digest(format!("ETag must carry 16 bytes, got {}", b.len()))
    })
}
