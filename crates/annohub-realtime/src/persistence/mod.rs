//! Best-effort durable log of broadcast annotations.

pub mod sink;
pub mod writer;

pub use sink::{AnnotationSink, FileSink};
pub use writer::SinkHandle;
