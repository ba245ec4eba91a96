//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use livefeed_sdk::prelude::*;
//!
//! let client: FeedClient = FeedClient::open("wss://example.com/feed", FeedConfig::default())?;
//! let mut updates = client.watch()?;
//! while let Some(payload) = updates.next().await {
//!     // StreamExt methods available without separate import
//! }
//! ```

pub use crate::{
    ConnectionState, Decode, ErrorEvent, ErrorKind, FeedClient, FeedClientBuilder, FeedConfig,
    FeedError, Payload, PayloadStream, SubscriptionHandle,
};

pub use futures_util::StreamExt;
