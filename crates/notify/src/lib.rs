//! Slack Web API client.
//!
//! Posts and updates attachment-style messages and lists the channels a
//! token can see. Every call is a single attempt; rate limiting surfaces as
//! [`ChannelError::RateLimited`] and is left to the caller.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Attachment, ChatMessage, SlackClient, SlackConfig};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let client = SlackClient::new(SlackConfig {
//!     token: Some("xoxb-...".to_string()),
//!     ..SlackConfig::default()
//! })?;
//!
//! let message = ChatMessage::with_attachment(Attachment {
//!     fallback: "New question".to_string(),
//!     color: "#B7E0ED".to_string(),
//!     title: "New question".to_string(),
//!     title_link: "https://stackoverflow.com/q/1".to_string(),
//!     ..Attachment::default()
//! });
//!
//! let posted = client.post_message("C0123456", &message).await?;
//! client.update_message(&posted.channel, &posted.ts, &message).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod message;
pub mod slack;

pub use error::ChannelError;
pub use message::{Attachment, ChannelInfo, ChatMessage, PostedMessage};
pub use slack::{SlackClient, SlackConfig, DEFAULT_API_HOST};
