//! # Fairylab Transport
//!
//! Slack plumbing for the Fairylab kernel.
//!
//! ## Features
//!
//! - `ws-client` (default): the real-time messaging socket client
//! - `http-client` (default): the Web API client, which also implements
//!   [`fairylab_core::ChatClient`] so plugins can post messages
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  fairylab-runtime    │  (feeds frames into the kernel)
//! ├──────────────────────┤
//! │  fairylab-transport  │  <- This crate
//! ├──────────────────────┤
//! │  Slack (wss / https) │
//! └──────────────────────┘
//! ```

pub mod config;
pub mod error;

#[cfg(feature = "ws-client")]
pub mod socket;

#[cfg(feature = "http-client")]
pub mod web;

pub use config::RetryConfig;
pub use error::{TransportError, TransportResult};

#[cfg(feature = "ws-client")]
pub use socket::{SocketClient, SocketHandler, SocketUrl, StaticUrl};

#[cfg(feature = "http-client")]
pub use web::{SLACK_API_URL, SlackWebClient};
