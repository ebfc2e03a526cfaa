//! Configuration loading and schema definitions
//!
//! One TOML file shared by the CLI and library consumers.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
