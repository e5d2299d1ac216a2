//! Resolving a user-selected file into a playable pixel stream.
//!
//! A `.pxlstrm` file is loaded as is. Any other file is treated as a video:
//! its cached conversion is used when present, otherwise it is converted
//! and (when caching is enabled) the result is stored next to it.

use std::path::{Path, PathBuf};

use crate::container::{FormatError, PixelStream, storage};
use crate::generate::{FrameDecoder, GenerationError, Generator};

/// Progress of [`open_source`], reported as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Loading,
    Converting,
    Ready,
    Failed(String),
}

/// Where the returned stream came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOrigin {
    /// The source itself was a stored stream.
    Stored(PathBuf),
    /// A previous conversion of the source was reused.
    Cached(PathBuf),
    /// The source was converted; `saved_to` is set when it was cached.
    Converted { saved_to: Option<PathBuf> },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Load or convert `source`, reporting progress through `on_status`.
///
/// Failures are reported as [`SourceStatus::Failed`] before being returned.
pub fn open_source<D, F>(
    source: &Path,
    generator: &Generator<D>,
    use_cache: bool,
    mut on_status: F,
) -> Result<(PixelStream, StreamOrigin), LoadError>
where
    D: FrameDecoder,
    F: FnMut(SourceStatus),
{
    let result = resolve(source, generator, use_cache, &mut on_status);
    match &result {
        Ok(_) => on_status(SourceStatus::Ready),
        Err(e) => {
            log::error!("Failed to open {}: {}", source.display(), e);
            on_status(SourceStatus::Failed(e.to_string()));
        }
    }
    result
}

fn resolve<D: FrameDecoder>(
    source: &Path,
    generator: &Generator<D>,
    use_cache: bool,
    on_status: &mut impl FnMut(SourceStatus),
) -> Result<(PixelStream, StreamOrigin), LoadError> {
    on_status(SourceStatus::Loading);

    if storage::is_container_path(source) {
        let stream = storage::load(source)?;
        return Ok((stream, StreamOrigin::Stored(source.to_path_buf())));
    }

    let cached = storage::cache_path(source);
    if use_cache && cached.is_file() {
        let stream = storage::load(&cached)?;
        return Ok((stream, StreamOrigin::Cached(cached)));
    }

    on_status(SourceStatus::Converting);
    let stream = generator.generate(source)?;

    let saved_to = if use_cache {
        storage::save(&cached, &stream)?;
        Some(cached)
    } else {
        None
    };
    Ok((stream, StreamOrigin::Converted { saved_to }))
}
