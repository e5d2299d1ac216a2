//! Loading and saving pixel streams on disk.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::format::{FormatError, PixelStream};

/// File extension for stored pixel streams.
pub const FILE_EXTENSION: &str = "pxlstrm";

/// Save a stream to `path`, replacing any existing file.
///
/// The stream is written to a temporary file in the same directory and
/// renamed over `path` once complete. On failure `path` is left untouched.
pub fn save<P: AsRef<Path>>(path: P, stream: &PixelStream) -> Result<(), FormatError> {
    let path = path.as_ref();
    write_atomically(path, |w| stream.write_to(w))?;
    log::info!("Saved {} frames to {}", stream.frame_count(), path.display());
    Ok(())
}

fn write_atomically<F>(path: &Path, write: F) -> Result<(), FormatError>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
{
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    // Dropped (and deleted) on any early return
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Load a stream from `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<PixelStream, FormatError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let stream = PixelStream::read_from(&mut reader)?;
    log::info!("Loaded {} ({})", path.display(), stream);
    Ok(stream)
}

/// Whether `path` names a stored pixel stream.
pub fn is_container_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
}

/// Cache location for a converted source: the full file name plus
/// `.pxlstrm` (`clip.mp4` becomes `clip.mp4.pxlstrm`).
pub fn cache_path(source: &Path) -> PathBuf {
    with_extension_appended(source)
}

/// Destination for converting `source`.
///
/// With no `output`, the stream lands next to the source. A single source
/// treats `output` as a file path (gaining the extension when it lacks it);
/// multiple sources treat it as a directory.
pub fn output_path(source: &Path, output: Option<&Path>, multiple: bool) -> PathBuf {
    match output {
        None => cache_path(source),
        Some(dir) if multiple => {
            let name = source.file_name().map(Path::new).unwrap_or(source);
            dir.join(with_extension_appended(name))
        }
        Some(file) if is_container_path(file) => file.to_path_buf(),
        Some(file) => with_extension_appended(file),
    }
}

fn with_extension_appended(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(FILE_EXTENSION);
    PathBuf::from(name)
}
