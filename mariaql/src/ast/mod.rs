mod definitions;

pub use definitions::*;
