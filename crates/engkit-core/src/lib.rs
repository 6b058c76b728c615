pub mod config;
pub mod context_doc;
pub mod dashboard;
pub mod error;
pub mod hooks;
pub mod io;
pub mod knowledge;
pub mod paths;
pub mod scaffold;
pub mod toolkit;
pub mod verify;

pub use error::{EngkitError, Result};
