//! Versioned document lifecycle engine.
//!
//! A document is a kinded, versioned JSON record with a compiled-in schema.
//! This crate provides the pieces every schema shares: the version gate, the
//! accumulating validation engine, the unused-field tracker, the chained
//! upgrade machine and the file operations built on top of them.

pub mod canonical;
pub mod error;
pub mod lifecycle;
pub mod schema;
pub mod unused;
pub mod upgrade;
pub mod validation;
pub mod version;

pub use error::DocumentError;
pub use lifecycle::Document;
pub use schema::{MarkerLocation, SchemaDescriptor};
pub use upgrade::Transition;
pub use validation::{Rule, Scope, Validate, Violation, Violations};
pub use version::Version;
