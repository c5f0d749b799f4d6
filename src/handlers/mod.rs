//! Handler implementations

pub mod fingers_crossed;
#[cfg(feature = "file")]
pub mod file;
pub mod group_handler;
pub mod null;
#[cfg(feature = "file")]
pub mod rotating_file;
pub mod stream;
pub mod test_handler;
pub mod threaded;

pub use fingers_crossed::FingersCrossedHandler;
#[cfg(feature = "file")]
pub use file::{FileHandler, FileHandlerBuilder};
pub use group_handler::GroupHandler;
pub use null::NullHandler;
#[cfg(feature = "file")]
pub use rotating_file::{RotatingFileHandler, RotationPolicy, TimedRotatingFileHandler};
#[cfg(feature = "console")]
pub use stream::ColorizedStderrHandler;
pub use stream::{StderrHandler, StdoutHandler, StreamHandler};
pub use test_handler::TestHandler;
pub use threaded::{ThreadedWrapperHandler, DEFAULT_QUEUE_SIZE, DEFAULT_SHUTDOWN_TIMEOUT};
