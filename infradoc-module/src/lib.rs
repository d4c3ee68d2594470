//! Module directory helper.
//!
//! A provisioning module keeps its configuration and state side by side in
//! one directory, with timestamped copies under `backup/`:
//!
//! ```text
//! <dir>/config.json
//! <dir>/state.json
//! <dir>/backup/config-<timestamp>.json
//! <dir>/backup/state-<timestamp>.json
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use infradoc_core::{Document, DocumentError};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const STATE_FILE_NAME: &str = "state.json";
pub const BACKUP_DIRECTORY_NAME: &str = "backup";

/// Timestamp in backup file names, microsecond precision.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S%.6f";

/// What to do when a document file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Init,
    Fail,
}

/// Loads, upgrades, backs up and saves the config and state documents of a
/// module directory.
#[derive(Debug, Clone)]
pub struct ModuleHelper {
    pub module_directory: PathBuf,
    /// Stamped into freshly initialized documents.
    pub module_version: String,
}

impl ModuleHelper {
    pub fn new(module_directory: impl Into<PathBuf>, module_version: impl Into<String>) -> Self {
        ModuleHelper {
            module_directory: module_directory.into(),
            module_version: module_version.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.module_directory.join(CONFIG_FILE_NAME)
    }

    pub fn state_path(&self) -> PathBuf {
        self.module_directory.join(STATE_FILE_NAME)
    }

    pub fn backup_directory(&self) -> PathBuf {
        self.module_directory.join(BACKUP_DIRECTORY_NAME)
    }

    fn prepare(&self) -> Result<()> {
        if self.module_directory.as_os_str().is_empty() {
            bail!("set up module directory path first");
        }
        if self.module_version.is_empty() {
            bail!("set up module version first");
        }
        fs::create_dir_all(&self.module_directory).with_context(|| {
            format!(
                "failed to create module directory {}",
                self.module_directory.display()
            )
        })
    }

    /// Load both documents, creating defaults for missing files and
    /// upgrading stale ones, then back them up.
    #[tracing::instrument(skip(self), fields(dir = %self.module_directory.display()))]
    pub fn initialize<C: Document, S: Document>(&self) -> Result<(C, S)> {
        self.prepare()?;
        let state = self
            .open::<S>(&self.state_path(), Missing::Init)
            .context("load state failed")?;
        let config = self
            .open::<C>(&self.config_path(), Missing::Init)
            .context("load config failed")?;
        self.backup(&config, &state)?;
        Ok((config, state))
    }

    /// Like [`ModuleHelper::initialize`], but both files must exist.
    #[tracing::instrument(skip(self), fields(dir = %self.module_directory.display()))]
    pub fn load<C: Document, S: Document>(&self) -> Result<(C, S)> {
        self.prepare()?;
        let state = self
            .open::<S>(&self.state_path(), Missing::Fail)
            .context("load state failed")?;
        let config = self
            .open::<C>(&self.config_path(), Missing::Fail)
            .context("load config failed")?;
        self.backup(&config, &state)?;
        Ok((config, state))
    }

    /// Validate and write both documents, state first.
    #[tracing::instrument(skip_all, fields(dir = %self.module_directory.display()))]
    pub fn save<C: Document, S: Document>(&self, config: &C, state: &S) -> Result<()> {
        self.prepare()?;
        state
            .save(&self.state_path())
            .context("save state failed")?;
        config
            .save(&self.config_path())
            .context("save config failed")?;
        Ok(())
    }

    fn open<D: Document>(&self, path: &Path, missing: Missing) -> Result<D, DocumentError> {
        match D::load(path) {
            Err(DocumentError::NotFound(_)) if missing == Missing::Init => {
                info!(kind = D::SCHEMA.kind, path = %path.display(), "no document found, initializing");
                Ok(D::init(&self.module_version))
            }
            Err(DocumentError::StaleVersion(found)) => {
                info!(
                    kind = D::SCHEMA.kind,
                    found = %found,
                    current = D::SCHEMA.version,
                    "upgrading document"
                );
                D::upgrade(path)
            }
            result => result,
        }
    }

    fn backup<C: Document, S: Document>(&self, config: &C, state: &S) -> Result<()> {
        let directory = self.backup_directory();
        fs::create_dir_all(&directory).with_context(|| {
            format!("failed to create backup directory {}", directory.display())
        })?;
        let timestamp = chrono::Local::now().format(BACKUP_TIMESTAMP_FORMAT);
        let config_path = directory.join(format!("config-{}.json", timestamp));
        config.backup(&config_path).context("config backup failed")?;
        let state_path = directory.join(format!("state-{}.json", timestamp));
        state.backup(&state_path).context("state backup failed")?;
        info!(config = %config_path.display(), state = %state_path.display(), "backed up documents");
        Ok(())
    }
}
