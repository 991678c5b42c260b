// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: a single JSON record under a restricted-permission
//! directory, replaced atomically. Pure persistence; no policy.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::credential::Credential;

/// File-backed store for the one persisted credential record.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store rooted at `dir`; the record lives in `credential.json`.
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join("credential.json") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record. An absent file is `None`. A malformed file
    /// is logged and treated as absent — the caller reacquires instead of
    /// crashing. Other I/O failures propagate.
    pub fn load(&self) -> anyhow::Result<Option<Credential>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::anyhow!("cannot read {}: {e}", self.path.display()));
            }
        };

        match serde_json::from_str(&contents) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "malformed credential record, treating as absent: {e}"
                );
                Ok(None)
            }
        }
    }

    /// Save the record, replacing any prior content atomically (unique temp
    /// name + rename, so a concurrent reader never sees a partial file).
    ///
    /// The containing directory is created with mode 0700 if missing; the
    /// record file gets mode 0600 before it appears under its final name.
    pub fn save(&self, credential: &Credential) -> anyhow::Result<()> {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent() {
            create_private_dir(dir)?;
        }

        let json = serde_json::to_string_pretty(credential)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Remove the persisted record. Absence is not an error.
    pub fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::anyhow!("cannot remove {}: {e}", self.path.display())),
        }
    }
}

/// Create `dir` (and parents) owner-only if it does not exist.
fn create_private_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
