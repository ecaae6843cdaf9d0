//! In-place metadata rewrite for finished demos.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::DemoConfig;
use crate::error::DemoResult;
use crate::metadata::{read_metadata_record, write_metadata_record, DemoMetadata};

/// Reads the metadata of the demo at `path`.
pub fn read_metadata(path: impl AsRef<Path>, config: &DemoConfig) -> DemoResult<DemoMetadata> {
    let mut reader = BufReader::new(File::open(path)?);
    let (metadata, _) = read_metadata_record(&mut reader, config.metadata_max_size, 0)?;
    Ok(metadata)
}

/// Replaces the metadata of the demo at `path`.
///
/// The new header and the original records are written to a temporary
/// file in the same directory, which is then renamed over `path`. The
/// original is untouched if anything fails.
pub fn rewrite_metadata(
    path: impl AsRef<Path>,
    metadata: &DemoMetadata,
    config: &DemoConfig,
) -> DemoResult<()> {
    let path = path.as_ref();
    let mut original = BufReader::new(File::open(path)?);
    let (_, max_size) = read_metadata_record(&mut original, config.metadata_max_size, 0)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_metadata_record(&mut writer, metadata, max_size, 0)?;
        io::copy(&mut original, &mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    drop(original);
    temp.persist(path).map_err(|err| err.error)?;

    tracing::info!(
        path = %path.display(),
        entries = metadata.len(),
        "demo metadata rewritten"
    );
    Ok(())
}
