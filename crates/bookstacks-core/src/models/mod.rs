pub mod book;
pub mod stats;

pub use book::*;
pub use stats::*;
