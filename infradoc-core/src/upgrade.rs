//! Chained version upgrades.
//!
//! A schema lists its supported version steps as [`Transition`] rows. [`run`]
//! walks a raw tree from its marked version to the schema's current version,
//! one row at a time. Steps edit the tree with JSON Patch operations and may
//! hand an embedded sub-tree to another schema's upgrade table.

use json_patch::{jsonptr::PointerBuf, AddOperation, PatchOperation};
use serde_json::Value;
use tracing::debug;

use crate::{DocumentError, SchemaDescriptor};

pub type Step = fn(&mut Value) -> Result<(), DocumentError>;

/// One upgrade row: edit a `from` tree with `step`, after which it is marked `to`.
#[derive(Debug)]
pub struct Transition {
    pub from: &'static str,
    pub to: &'static str,
    pub step: Step,
}

/// Upgrade `tree` to the current version of `schema`.
///
/// Works on a copy; `tree` is only replaced when every step succeeded.
pub fn run(schema: &SchemaDescriptor, tree: &mut Value) -> Result<(), DocumentError> {
    let mut work = tree.clone();
    let mut steps = 0;
    loop {
        let found = schema.found_version(&work)?.to_string();
        if schema.is_current(&found) {
            break;
        }
        // A table with a cycle never reaches the current version.
        if steps >= schema.upgrades.len() {
            return Err(DocumentError::UnknownVersion(found));
        }
        let transition = schema
            .upgrades
            .iter()
            .find(|t| t.from == found)
            .ok_or(DocumentError::UnknownVersion(found))?;
        debug!(
            kind = schema.kind,
            from = transition.from,
            to = transition.to,
            "upgrading document"
        );
        (transition.step)(&mut work)?;
        schema.marker.write(&mut work, transition.to)?;
        steps += 1;
    }
    *tree = work;
    Ok(())
}

/// Upgrade the sub-tree at `pointer` with `schema`. An absent or null
/// sub-tree is left alone.
pub fn run_at(schema: &SchemaDescriptor, tree: &mut Value, pointer: &str) -> Result<(), DocumentError> {
    match tree.pointer_mut(pointer) {
        Some(sub) if !sub.is_null() => run(schema, sub),
        _ => Ok(()),
    }
}

/// Set the field at `path` (a sequence of object keys), adding it if needed.
/// The parent must exist.
pub fn set(tree: &mut Value, path: &[&str], value: Value) -> Result<(), DocumentError> {
    let op = PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(path.iter().copied()),
        value,
    });
    json_patch::patch(tree, &[op])
        .map_err(|e| DocumentError::malformed(format!("upgrade step failed: {}", e)))
}
