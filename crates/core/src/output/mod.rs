//! Artifact assembly and persistence

pub mod formatter;
pub mod writer;

pub use formatter::{CommandFormatter, Formatter, NoopFormatter};
pub use writer::OutputWriter;
