//! Transport implementations

pub mod console;
pub mod file;
pub mod remote;
pub mod rotation;
pub mod scheduler;

pub use console::ConsoleTransport;
pub use file::FileTransport;
pub use remote::{
    backoff_delay, BatchSink, HttpBatchSink, RemoteBatch, RemoteConfig, RemoteTransport,
    DELIVERY_FAILED_KEY,
};
pub use rotation::{RotatingWriter, RotationPeriod, RotationPolicy};
pub use scheduler::{Cancellation, Scheduler};
