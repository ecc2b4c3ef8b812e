#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod dom;
pub mod driver;
pub mod error;
pub mod page;
pub mod scheduler;
pub mod telemetry;
pub mod types;
pub mod ui;

pub type Result<T> = std::result::Result<T, error::Error>;
