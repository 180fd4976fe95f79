mod credits;

pub use credits::*;
