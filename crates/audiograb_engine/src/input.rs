use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use thiserror::Error;

use crate::decode::{decode_text, DecodeError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot read input file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode input file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Turn the user's input into the ordered URL list for a batch.
///
/// An existing file is read as a URL list; anything else is the sole URL.
/// URL syntax is not checked here.
pub fn resolve_input(raw_input: &str) -> Result<Vec<String>, ResolveError> {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let path = Path::new(trimmed);
    if !path.is_file() {
        return Ok(vec![trimmed.to_string()]);
    }

    let bytes = fs::read(path).map_err(|source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = decode_text(&bytes).map_err(|source| ResolveError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let urls = split_url_lines(&decoded.text);
    engine_debug!(
        "resolved {} url(s) from {:?} ({})",
        urls.len(),
        path,
        decoded.encoding_label
    );
    Ok(urls)
}

/// Non-empty trimmed lines, in order.
pub fn split_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
