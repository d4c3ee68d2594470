//! Compile-time description of one document kind.

use serde_json::Value;

use crate::{upgrade::Transition, DocumentError};

const NOT_UNDERSTOOD: &str = "structure doesn't look like one we can understand";

/// Where a document keeps its `version` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLocation {
    /// Inside a `meta` object, next to `kind` and `module_version`.
    Meta,
    /// Directly on the root object, next to `kind`.
    TopLevel,
}

impl MarkerLocation {
    /// JSON pointer to the version marker.
    pub fn pointer(&self) -> &'static str {
        match self {
            MarkerLocation::Meta => "/meta/version",
            MarkerLocation::TopLevel => "/version",
        }
    }

    /// Read the version marker from a raw document tree.
    pub fn read<'v>(&self, tree: &'v Value) -> Result<&'v str, DocumentError> {
        let holder = match self {
            MarkerLocation::Meta => tree
                .get("meta")
                .filter(|meta| meta.is_object())
                .ok_or_else(|| {
                    DocumentError::malformed(format!(
                        "{} - does not have meta object",
                        NOT_UNDERSTOOD
                    ))
                })?,
            MarkerLocation::TopLevel => {
                if !tree.is_object() {
                    return Err(DocumentError::malformed(format!(
                        "{} - not an object",
                        NOT_UNDERSTOOD
                    )));
                }
                tree
            }
        };
        holder
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                let what = match self {
                    MarkerLocation::Meta => "meta object",
                    MarkerLocation::TopLevel => "document",
                };
                DocumentError::malformed(format!(
                    "{} - {} does not have version field",
                    NOT_UNDERSTOOD, what
                ))
            })
    }

    /// Overwrite the version marker in a raw document tree.
    pub fn write(&self, tree: &mut Value, version: &str) -> Result<(), DocumentError> {
        let slot = tree.pointer_mut(self.pointer()).ok_or_else(|| {
            DocumentError::malformed(format!(
                "{} - no version marker at {}",
                NOT_UNDERSTOOD,
                self.pointer()
            ))
        })?;
        *slot = Value::String(version.to_string());
        Ok(())
    }
}

/// Kind, current version, marker location and upgrade table of a schema.
#[derive(Debug)]
pub struct SchemaDescriptor {
    pub kind: &'static str,
    /// The only version `load` accepts without upgrading.
    pub version: &'static str,
    pub marker: MarkerLocation,
    /// One row per supported version step, see [`crate::upgrade`].
    pub upgrades: &'static [Transition],
}

impl SchemaDescriptor {
    /// Read this schema's version marker from a raw tree.
    pub fn found_version<'v>(&self, tree: &'v Value) -> Result<&'v str, DocumentError> {
        self.marker.read(tree)
    }

    pub fn is_current(&self, found: &str) -> bool {
        found == self.version
    }
}
