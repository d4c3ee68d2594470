//! Document schemas of the infrastructure modules.
//!
//! Each module keeps its schemas in a versioned submodule (`v0`), so that a
//! future incompatible layout can live next to the current one.

pub mod awsbi;
pub mod azbi;
pub mod azks;
pub mod state;
pub mod status;
