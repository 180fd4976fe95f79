mod common;
mod users;
mod workspaces;

pub use users::SqliteUserRepo;
pub use workspaces::SqliteWorkspaceRepo;
