//! Error to Problem conversion and response writing.

pub mod builder;
pub mod writer;

pub use builder::{CustomMapping, ProblemBuilder};
pub use writer::{ProblemWriter, ResponseBuffer, ResponseSink};
