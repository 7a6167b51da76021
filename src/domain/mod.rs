mod book;
mod catalog;

pub use book::*;
pub use catalog::*;
