//! Filesystem export sink: the CLI's "save file" action.

use std::fs;
use std::path::PathBuf;

use reconview_recon::{ExportError, ExportFile, ExportSink};

/// Writes export files into one directory, overwriting same-named files.
pub struct DirectorySink {
    dir: PathBuf,
    saved: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), saved: Vec::new() }
    }

    /// Every path written so far, in order.
    #[cfg(test)]
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }
}

impl ExportSink for DirectorySink {
    fn save(&mut self, file: &ExportFile) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ExportError::Io(format!("{}: {e}", self.dir.display())))?;
        let path = self.dir.join(&file.file_name);
        fs::write(&path, &file.bytes)
            .map_err(|e| ExportError::Io(format!("{}: {e}", path.display())))?;
        log::debug!("wrote {} bytes to {}", file.bytes.len(), path.display());
        self.saved.push(path.clone());
        Ok(path)
    }
}
