pub mod filesystem;
pub mod logging;

pub use logging::{init_tracing, LogLevel, Logger, LoggerTrait, MultiLogger, TracingLogger};
