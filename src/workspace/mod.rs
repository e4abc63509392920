pub mod cleanup;
pub mod registry;
pub mod scratch;

pub use cleanup::{delete_or_defer, delete_path, retry_pending, sweep_stale_workspaces, CleanupReport};
pub use registry::{JsonPathSet, PersistentPathSet};
pub use scratch::Workspace;
