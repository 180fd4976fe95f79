mod credits;
mod workspace;

pub use credits::*;
pub use workspace::*;
