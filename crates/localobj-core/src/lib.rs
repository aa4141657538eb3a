//! localobj core - platform-independent store lifecycle
//!
//! This crate provides the configuration values, error types, process traits,
//! readiness poller and the `Store` state machine shared by the platform
//! crates and the `localobj` facade.

mod backend;
mod client;
mod config;
mod error;
mod poll;
mod process;
mod stdio;
mod store;

pub use backend::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use poll::poll_until_ready;
pub use process::*;
pub use stdio::*;
pub use store::*;

pub use aws_sdk_s3;
pub use tokio_util::sync::CancellationToken;
