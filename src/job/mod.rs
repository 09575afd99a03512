pub mod client;
pub mod error;
pub mod http;
pub mod ports;

pub use client::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, JobClient, PollPolicy};
pub use error::{AnalysisError, AnalysisErrorKind};
pub use http::HttpAnalysisBackend;
pub use ports::AnalysisBackend;
