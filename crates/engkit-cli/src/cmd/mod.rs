pub mod dashboard;
pub mod hook;
pub mod init;
pub mod knowledge;
pub mod update;
pub mod verify;

use anyhow::Context;
use engkit_core::toolkit::{DirToolkit, EmbeddedToolkit, Toolkit};
use std::path::Path;

/// The embedded toolkit, or the on-disk tree given by `--toolkit`.
pub fn load_toolkit(dir: Option<&Path>) -> anyhow::Result<Box<dyn Toolkit>> {
    match dir {
        Some(dir) => {
            let kit = DirToolkit::open(dir)
                .with_context(|| format!("failed to open toolkit at {}", dir.display()))?;
            Ok(Box::new(kit))
        }
        None => Ok(Box::new(EmbeddedToolkit)),
    }
}
