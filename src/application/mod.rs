// Application layer: the book lifecycle operations, run against an
// injected world-state store.

pub mod error;
mod service;

pub use error::*;
pub use service::*;
