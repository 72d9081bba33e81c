#![warn(rust_2018_idioms)]

pub mod app;
pub mod batch;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod healthcheck;
pub mod intake;
pub mod server;

pub use app::Config;
pub use error::RelayError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
