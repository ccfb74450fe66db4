//! Event distribution bundles: `<event>.ar.gz.enc`, an encrypted, gzipped ar
//! archive of challenge binaries plus `manifest.json`.

use crate::archive::{extract_members, ArchiveLimits};
use crate::cipher::{BundleCipher, Passphrase};
use crate::error::{CoreError, CoreResult};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};

pub mod manifest;

pub use manifest::{ChallengeEntry, EventManifest, MANIFEST_FILE};

pub const EVENT_BUNDLE_EXTENSION: &str = ".ar.gz.enc";

#[derive(Debug, Clone)]
pub struct UnpackedEvent {
    pub event: String,
    pub files: Vec<PathBuf>,
    pub manifest: EventManifest,
}

/// `<event>.ar.gz.enc` -> `<event>`.
pub fn event_name(bundle: &Path) -> CoreResult<String> {
    let file_name = bundle
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::Naming(format!("{} has no file name", bundle.display())))?;
    match file_name.strip_suffix(EVENT_BUNDLE_EXTENSION) {
        Some(event) if !event.is_empty() => Ok(event.to_string()),
        _ => Err(CoreError::Naming(format!(
            "event bundle must be named <event>{}, got {}",
            EVENT_BUNDLE_EXTENSION, file_name
        ))),
    }
}

/// Decrypts, decompresses and extracts an event bundle into `output_dir`, then
/// reads its manifest. Existing files in `output_dir` are never overwritten.
pub fn unpack_event_bundle<C: BundleCipher>(
    cipher: &C,
    bundle: &Path,
    passphrase: &Passphrase,
    output_dir: &Path,
    limits: &ArchiveLimits,
) -> CoreResult<UnpackedEvent> {
    let event = event_name(bundle)?;
    if !bundle.is_file() {
        return Err(CoreError::resource(bundle, "cannot find event bundle"));
    }
    if !output_dir.is_dir() {
        return Err(CoreError::resource(output_dir, "output directory not found"));
    }

    let compressed = cipher.decrypt(bundle, passphrase)?;
    tracing::info!(event = %event, bytes = compressed.len(), "event bundle decrypted");

    let extracted = extract_members(GzDecoder::new(&compressed[..]), output_dir, limits)?;
    tracing::info!(event = %event, members = extracted.names.len(), "event bundle extracted");

    let manifest = EventManifest::load(&output_dir.join(MANIFEST_FILE))?;
    let files = extracted
        .names
        .iter()
        .map(|n| output_dir.join(n))
        .collect();
    Ok(UnpackedEvent {
        event,
        files,
        manifest,
    })
}
