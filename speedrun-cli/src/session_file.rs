//! On-disk storage of the session id between invocations

use crate::error::SessionFileError;
use std::fs;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// File holding the current session id, readable by the owner only
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Stored session id, or None if there is no (non-empty) file
    pub fn load(&self) -> Result<Option<Zeroizing<String>>, SessionFileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = Zeroizing::new(fs::read_to_string(&self.path)?);
        let session = content.trim();
        if session.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Zeroizing::new(session.to_string())))
        }
    }

    /// Replace the stored session id
    pub fn store(&self, session: &str) -> Result<(), SessionFileError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                SessionFileError::DirCreation(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        fs::write(&self.path, session)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Delete the stored session id; a missing file is not an error
    pub fn remove(&self) -> Result<(), SessionFileError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
