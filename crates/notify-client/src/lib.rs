//! Change Notification Client
//!
//! Notification model and delivery sinks for the change-watch controller.
//!
//! # Example
//!
//! ```no_run
//! use notify_client::{build_sinks, NotificationEvent, Reason, Status};
//! use watch_config::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let sinks = build_sinks(&config)?;
//!
//! let event = NotificationEvent {
//!     name: "foo".to_string(),
//!     namespace: "bar".to_string(),
//!     kind: "Pod".to_string(),
//!     api_version: "v1".to_string(),
//!     status: Status::Normal,
//!     reason: Reason::Created,
//!     obj: None,
//!     old_obj: None,
//! };
//! for sink in &sinks {
//!     sink.handle(&event).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Sinks
//!
//! - **Log**: writes the message to the tracing log (used when nothing else is configured)
//! - **Webhook**: generic JSON POST with event metadata
//! - **Slack / Discord / MS Teams / Lark**: chat incoming webhooks
//! - **CloudEvent**: structured-mode CloudEvents 1.0 over HTTP

pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod sink_trait;
pub mod sinks;
#[cfg(feature = "test-util")]
pub mod mock;

pub use common::HttpClient;
pub use error::SinkError;
pub use models::*;
pub use sink_trait::Sink;
pub use sinks::*;
#[cfg(feature = "test-util")]
pub use mock::MockSink;
