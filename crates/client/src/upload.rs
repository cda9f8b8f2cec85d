//! Local validation of the two files before anything goes over the wire.

use std::path::Path;

use thiserror::Error;

/// Upper bound on a single uploaded file.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not a `.csv` file, or larger than [`MAX_UPLOAD_BYTES`].
    #[error("Please upload a CSV file under 10MB")]
    InvalidFile { name: String },
    /// One side of the pair was never selected.
    #[error("Please select both files")]
    MissingFiles,
    #[error("cannot read {name}: {message}")]
    Unreadable { name: String, message: String },
}

/// A validated CSV file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    /// Validate and read a file from disk. Size is checked before reading.
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if !is_csv_name(&name) {
            return Err(ValidationError::InvalidFile { name });
        }
        let unreadable = |e: std::io::Error| ValidationError::Unreadable {
            name: name.clone(),
            message: e.to_string(),
        };
        let size = std::fs::metadata(path).map_err(unreadable)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ValidationError::InvalidFile { name });
        }
        let bytes = std::fs::read(path).map_err(unreadable)?;
        Self::from_bytes(name, bytes)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let name = name.into();
        if !is_csv_name(&name) || bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(ValidationError::InvalidFile { name });
        }
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn is_csv_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Both sides of a reconciliation upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPair {
    pub internal: UploadFile,
    pub provider: UploadFile,
}

impl UploadPair {
    pub fn new(internal: Option<UploadFile>, provider: Option<UploadFile>) -> Result<Self, ValidationError> {
        match (internal, provider) {
            (Some(internal), Some(provider)) => Ok(Self { internal, provider }),
            _ => Err(ValidationError::MissingFiles),
        }
    }

    pub fn from_paths(internal: &Path, provider: &Path) -> Result<Self, ValidationError> {
        Ok(Self {
            internal: UploadFile::from_path(internal)?,
            provider: UploadFile::from_path(provider)?,
        })
    }
}
