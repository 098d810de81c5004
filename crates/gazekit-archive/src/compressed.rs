//! Single-file decompression (`.gz`, `.bz2`)

use crate::error::{ArchiveError, Result};
use crate::tar::TarCompression;
use crate::write_entry;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Decompress `source` into `destination/<stem>`, where the stem is the file
/// name without its compression suffix.
///
/// The decompressed size is unknown up front, so `resume` never skips.
pub fn decompress_file(
    source: &Path,
    destination: &Path,
    compression: TarCompression,
) -> Result<PathBuf> {
    let Some(stem) = source.file_stem() else {
        return Err(ArchiveError::UnknownFileType {
            path: source.to_path_buf(),
        });
    };

    let reader = BufReader::new(File::open(source)?);
    let mut decoder = compression.decoder(reader);
    let target = destination.join(stem);
    write_entry(&mut decoder, &target, None, false)?;
    Ok(target)
}
