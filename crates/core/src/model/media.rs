use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("image reference cannot be empty")]
    EmptyImageRef,

    #[error("image url is not valid: {0}")]
    InvalidUrl(String),
}

//
// ─── IMAGE REFERENCE ───────────────────────────────────────────────────────────
//

/// Location of an illustration attached to a question.
///
/// Remote assets are kept as parsed URLs; everything else is treated as a
/// path relative to the bank's asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    FilePath(PathBuf),
    Url(Url),
}

impl ImageRef {
    /// Parse a raw bank value into an image reference.
    ///
    /// Values with an `http`/`https` scheme must be valid URLs.
    ///
    /// # Errors
    ///
    /// Returns `MediaValidationError` when the value is blank or a malformed URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MediaValidationError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(MediaValidationError::EmptyImageRef);
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            let u = Url::parse(s).map_err(|e| MediaValidationError::InvalidUrl(e.to_string()))?;
            return Ok(ImageRef::Url(u));
        }
        Ok(ImageRef::FilePath(PathBuf::from(s)))
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ImageRef::FilePath(p) => Some(p.as_path()),
            ImageRef::Url(_) => None,
        }
    }

    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            ImageRef::Url(u) => Some(u),
            ImageRef::FilePath(_) => None,
        }
    }

    /// String form suitable for persisting or handing to a renderer.
    #[must_use]
    pub fn to_raw(&self) -> String {
        match self {
            ImageRef::FilePath(p) => p.display().to_string(),
            ImageRef::Url(u) => u.to_string(),
        }
    }
}
