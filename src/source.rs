//! Where payloads come from.
//!
//! A [`Payload`] is an opaque, non-empty byte string plus the place it came
//! from. Files are read through [`FileSource`], a lazy iterator over the
//! paths given on the command line; broker messages become payloads in
//! [`crate::services`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reading payload files.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file exists but holds no bytes.
    #[error("{0} is empty")]
    Empty(PathBuf),
}

/// Where a payload came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadOrigin {
    /// Read from a local file.
    File(PathBuf),
    /// Received on a broker topic.
    Topic(String),
}

impl fmt::Display for PayloadOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Topic(topic) => write!(f, "topic {}", topic),
        }
    }
}

/// One MTB payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    origin: PayloadOrigin,
    bytes: Vec<u8>,
}

impl Payload {
    /// Creates a payload, or `None` if `bytes` is empty.
    pub fn new(origin: PayloadOrigin, bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self { origin, bytes })
        }
    }

    /// Reads a whole file as one payload.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(PayloadOrigin::File(path.to_path_buf()), bytes)
            .ok_or_else(|| SourceError::Empty(path.to_path_buf()))
    }

    /// Where the payload came from.
    pub fn origin(&self) -> &PayloadOrigin {
        &self.origin
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte count (never zero).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload holds no bytes. A constructed payload never does.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reads payload files one at a time, in the order given.
///
/// Each call to `next` reads one whole file. Callers that must not touch the
/// display before every file is known good should collect first:
///
/// ```rust,no_run
/// use mtb_display::source::{FileSource, Payload, SourceError};
///
/// let payloads: Result<Vec<Payload>, SourceError> =
///     FileSource::new(["a.mtb", "b.mtb"]).collect();
/// ```
#[derive(Debug)]
pub struct FileSource {
    paths: std::vec::IntoIter<PathBuf>,
}

impl FileSource {
    /// Creates a source over `paths`.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(Into::into)
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }

    /// Number of files not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for FileSource {
    type Item = Result<Payload, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(Payload::from_file(path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}
