//! Load, save, backup, print and upgrade, shared by every document kind.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write as _},
    path::Path,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{canonical, unused, upgrade, validation, DocumentError, SchemaDescriptor, Validate};

/// A versioned, kinded document with a compiled-in schema.
///
/// Implementors provide the schema, a default instance and access to the
/// unused-field list; everything else is provided.
pub trait Document: Validate + Serialize + DeserializeOwned {
    const SCHEMA: &'static SchemaDescriptor;

    /// First segment of every violation namespace, e.g. `Config`.
    const ROOT: &'static str;

    /// The default instance, at the current version.
    fn init(module_version: &str) -> Self;

    /// Input fields that did not map onto the schema in the last decode.
    fn unused(&self) -> &[String];

    fn set_unused(&mut self, unused: Vec<String>);

    /// Run the declarative and custom validation rules.
    fn check(&self) -> Result<(), DocumentError> {
        validation::run(Self::ROOT, self).map_err(DocumentError::ValidationFailed)
    }

    /// Validate and encode canonically.
    fn marshal(&self) -> Result<Vec<u8>, DocumentError> {
        self.check()?;
        canonical::to_bytes(self)
    }

    /// Decode and validate, without looking at the version marker.
    fn unmarshal(bytes: &[u8]) -> Result<Self, DocumentError> {
        let tree = parse(bytes)?;
        Self::from_tree(&tree)
    }

    /// Decode a raw tree, recording unused fields, then validate.
    fn from_tree(tree: &Value) -> Result<Self, DocumentError> {
        let (mut document, unused) = unused::decode::<Self>(tree)?;
        if !unused.is_empty() {
            warn!(kind = Self::SCHEMA.kind, fields = ?unused, "document has unused fields");
        }
        document.set_unused(unused);
        document.check()?;
        Ok(document)
    }

    /// Read a current-version document from `path`.
    fn load(path: &Path) -> Result<Self, DocumentError> {
        let tree = read_tree(path)?;
        let found = Self::SCHEMA.found_version(&tree)?;
        debug!(
            kind = Self::SCHEMA.kind,
            path = %path.display(),
            found,
            current = Self::SCHEMA.version,
            "checking document version"
        );
        if !Self::SCHEMA.is_current(found) {
            return Err(DocumentError::StaleVersion(found.to_string()));
        }
        Self::from_tree(&tree)
    }

    /// Validate and write to `path`, replacing any existing file.
    fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = self.marshal()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Write to a new file at `path`, without validating.
    fn backup(&self, path: &Path) -> Result<(), DocumentError> {
        let bytes = canonical::to_bytes(self)?;
        write_new(path, &bytes)
    }

    /// The canonical encoding, after validation.
    fn print(&self) -> Result<Vec<u8>, DocumentError> {
        self.marshal()
    }

    /// Read the document at `path` and bring it to the current version.
    /// The file is not rewritten.
    fn upgrade(path: &Path) -> Result<Self, DocumentError> {
        let mut tree = read_tree(path)?;
        upgrade::run(Self::SCHEMA, &mut tree)?;
        Self::from_tree(&tree)
    }

    /// [`Document::unmarshal`] the file at `path`, or [`Document::init`] if
    /// there is none.
    fn load_or_default(path: &Path, module_version: &str) -> Result<Self, DocumentError> {
        match fs::read(path) {
            Ok(bytes) => Self::unmarshal(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::init(module_version)),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse(bytes: &[u8]) -> Result<Value, DocumentError> {
    serde_json::from_slice(bytes).map_err(|e| DocumentError::malformed(e.to_string()))
}

fn read_tree(path: &Path) -> Result<Value, DocumentError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DocumentError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    parse(&bytes)
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(DocumentError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(bytes)?;
    Ok(())
}
