//! Configuration file handling for the host plugin.
//!
//! On load the document is migrated to the current version and written
//! back when migration changed it; a missing file is created with defaults.

use std::path::{Path, PathBuf};

use invlock_core::config::{LockConfig, Migration};
use invlock_core::error::Result;
use tracing::{info, warn};

/// A configuration document bound to its file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    config: LockConfig,
}

impl ConfigFile {
    /// Read `path`, migrate, and persist any migration. Creates the file
    /// with defaults when it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if writing it back fails.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            warn!(path = %path.display(), "Config file missing, writing defaults");
            let file = Self {
                path,
                config: LockConfig::default(),
            };
            file.save()?;
            return Ok(file);
        }

        let (config, migration) = LockConfig::from_file(&path)?.migrate();
        let file = Self { path, config };
        match &migration {
            Migration::UpToDate => {}
            Migration::Upgraded { from } | Migration::Rebuilt { from } => {
                warn!(
                    from = %from,
                    to = %file.config.version,
                    rebuilt = matches!(migration, Migration::Rebuilt { .. }),
                    "Config update complete"
                );
            }
        }
        if migration.changed() {
            file.save()?;
        }
        info!(path = %file.path.display(), "Config loaded");
        Ok(file)
    }

    /// Write the document as indented JSON.
    ///
    /// # Errors
    /// Returns an error on encoding or I/O failure.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, self.config.to_json_pretty()?)?;
        Ok(())
    }

    /// The loaded document.
    #[must_use]
    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Where the document lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
