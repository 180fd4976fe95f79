mod users;
mod workspaces;

pub use users::*;
pub use workspaces::*;
