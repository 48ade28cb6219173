use std::{
    io,
    path::{Path, PathBuf},
};

/// An error that occurred while reading an imported source.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("couldn't read {0}: {1}")]
    ReadFile(PathBuf, #[source] io::Error),
    #[error("file {0} not found")]
    NotFound(PathBuf),
}

/// Loads the text of sources that were imported but not added explicitly.
///
/// Called once per missing source name, synchronously. Errors are reported to the user as is.
pub trait FileReader {
    /// Returns the content of the source named `path`, or a message describing the failure.
    fn read(&mut self, path: &str) -> Result<String, String>;
}

impl<F: FnMut(&str) -> Result<String, String>> FileReader for F {
    fn read(&mut self, path: &str) -> Result<String, String> {
        self(path)
    }
}

/// Reads sources from the filesystem, relative to a base directory.
#[derive(Clone, Debug, Default)]
pub struct FsReader {
    base: PathBuf,
}

impl FsReader {
    /// Creates a reader resolving source names relative to `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Reads the source named `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn read_file(&self, path: &str) -> Result<String, ImportError> {
        let full = self.base.join(path);
        if !full.is_file() {
            return Err(ImportError::NotFound(path.into()));
        }
        std::fs::read_to_string(&full).map_err(|e| ImportError::ReadFile(path.into(), e))
    }
}

impl FileReader for FsReader {
    fn read(&mut self, path: &str) -> Result<String, String> {
        self.read_file(path).map_err(|e| e.to_string())
    }
}
