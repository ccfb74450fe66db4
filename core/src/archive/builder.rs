use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

// Deterministic GNU ar builder, equivalent to `ar crSD`:
// - members appended in the order given (PoV first, then RBs ascending)
// - no symbol table
// - names over 15 bytes go through the `//` name table, so a 16-byte
//   `POV_<csid>.xml` survives GNU `ar t`/`ar x` intact
// - mtime, uid and gid fixed at zero
// - mode fixed at 0644
// Identical inputs therefore always produce byte-identical archives, which is
// what lets the archive hash double as the bundle name.
pub fn build_archive<W: Write>(writer: W, members: &[(String, PathBuf)]) -> CoreResult<W> {
    let identifiers: Vec<Vec<u8>> = members
        .iter()
        .map(|(name, _)| name.as_bytes().to_vec())
        .collect();
    let mut builder = ar::GnuBuilder::new(writer, identifiers);
    for (name, path) in members {
        let f = File::open(path).map_err(|e| CoreError::resource(path, e.to_string()))?;
        let size = f.metadata()?.len();

        let mut header = ar::Header::new(name.as_bytes().to_vec(), size);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(0o644);
        builder.append(&header, f)?;
    }
    Ok(builder.into_inner()?)
}

pub fn build_archive_bytes(members: &[(String, PathBuf)]) -> CoreResult<Vec<u8>> {
    build_archive(Vec::new(), members)
}
