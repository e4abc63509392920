pub mod defaults;
pub mod settings;

pub use settings::{default_registry_path, Settings};
