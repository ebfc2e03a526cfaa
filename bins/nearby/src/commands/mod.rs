//! CLI command implementations

pub mod migrate;
pub mod search;
pub mod user;
pub mod watch;

use crate::OutputFormat;
use nearby_core::config::Config;
use nearby_core::Result;
use nearby_directory::store::JsonFileStore;
use serde::Serialize;
use std::path::Path;

/// Settings shared by every command.
pub struct Context {
    pub config: Config,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Context {
    pub fn store_path(&self) -> &Path {
        &self.config.schema.store.path
    }

    pub fn open_store(&self) -> Result<JsonFileStore> {
        Ok(JsonFileStore::open(self.store_path())?)
    }

    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Prints `value` as pretty JSON on stdout.
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
