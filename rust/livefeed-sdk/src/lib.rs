//! # livefeed-sdk
//!
//! Resilient client for real-time data feeds.
//!
//! A [`FeedClient`] keeps one connection to a WebSocket endpoint that pushes
//! discrete frames, decodes each frame (JSON by default), stores the latest
//! value under a client-assigned sequence number and fans it out to every
//! subscriber. Lost connections are retried with exponential backoff until
//! the client is closed or the attempt ceiling is reached.
//!
//! ## Example
//!
//! ```rust,ignore
//! use livefeed_sdk::{FeedClient, FeedConfig};
//! use serde_json::Value;
//!
//! let client = FeedClient::<Value>::builder("wss://example.com/feed")
//!     .max_attempts(10)
//!     .on_error(|e| eprintln!("{}: {}", e.kind, e.detail))
//!     .open()?;
//!
//! client.subscribe(|payload| println!("#{} {}", payload.sequence, payload.value))?;
//!
//! // ...
//! let last = client.latest();
//! client.close();
//! ```
//!
//! ## Components
//!
//! - **ConnectionManager** - connect, detect loss, back off, retry
//! - **FeedState** - latest payload, sequence counter, subscribers
//! - **FeedClient** - both behind one handle

mod backoff;
mod client;
mod config;
mod connection;
mod decode;
mod endpoint;
mod error;
mod feed;
pub mod prelude;
mod registry;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod transport;

pub use backoff::Backoff;
pub use client::{FeedClient, FeedClientBuilder};
pub use config::FeedConfig;
pub use connection::ConnectionState;
pub use decode::{Decode, JsonDecoder};
pub use endpoint::Endpoint;
pub use error::{ErrorEvent, ErrorKind, FeedError, Result};
pub use feed::{FeedState, Payload, PayloadStream};
pub use registry::SubscriptionHandle;

pub use serde_json::Value;
