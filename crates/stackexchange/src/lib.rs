//! Stack Exchange API client.
//!
//! This crate provides the pieces needed to poll a Stack Exchange site for
//! questions:
//!
//! - [`Parameters`]: per-endpoint whitelist of query parameters with defaults
//! - [`Paging`]: page cursor driven by the `has_more` flag of each response
//! - [`Query`]: an advanced search or questions-by-ids request
//! - [`Client`]: executes queries and remembers the reported request quota
//!
//! # Usage
//!
//! ```no_run
//! use stackexchange::{Client, ClientConfig};
//!
//! # async fn run() -> Result<(), stackexchange::Error> {
//! let client = Client::new(ClientConfig::default())?;
//!
//! let mut query = client.search_advanced();
//! query.parameters.set("tagged", "aframe");
//! query.parameters.set("fromdate", 1_500_000_000_i64);
//!
//! let page = client.fetch(&mut query).await?;
//! println!("{} questions, quota {}", page.items.len(), client.quota());
//! # Ok(())
//! # }
//! ```


pub mod client;
pub mod error;
pub mod paging;
pub mod parameters;
pub mod query;
pub mod types;

pub use client::{Client, ClientConfig, Quota, DEFAULT_API_HOST, DEFAULT_API_VERSION};
pub use error::Error;
pub use paging::Paging;
pub use parameters::{AllowedParam, ParamValue, Parameters};
pub use query::{Query, QueryKind, DEFAULT_FILTER, PLACEHOLDER_QUESTION_ID};
pub use types::{epoch, BadgeCounts, QuestionItem, QuestionsEnvelope, ShallowUser};
