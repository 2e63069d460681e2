//! Report sinks that fan drift reports out of the controller.

pub mod fanout;
pub mod handoff;
pub mod log;
pub mod ntfy;

pub use fanout::FanoutSink;
pub use handoff::HandoffFileSink;
pub use log::LogSink;
pub use ntfy::NtfySink;
