//! Mirror a tagged Stack Exchange question feed into a Slack channel.
//!
//! Each cycle pulls new questions into a local SQLite store, refreshes the
//! most recent `questions-to-watch` of them, posts the ones Slack has not
//! seen and keeps the posted messages current. Questions that drop out of
//! that window get a final stripped update and are forgotten.
//!
//! ```no_run
//! use std::sync::Arc;
//! use slackoverflow::{Config, Engine, EngineSettings};
//!
//! # async fn run(config: Config) -> anyhow::Result<()> {
//! let store = Arc::new(store::Store::open_in_memory()?);
//! let source = Arc::new(stackexchange::Client::new(stackexchange::ClientConfig::default())?);
//! let mut engine = Engine::new(store, source, EngineSettings::from_config(&config));
//!
//! let report = engine.run_cycle().await;
//! println!("{} new questions", report.new_questions.created);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod projector;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod watch;

pub use config::{Config, ConfigError, Paths};
pub use engine::{ChatReport, CycleReport, Engine, EngineSettings, SyncReport};
pub use error::SyncError;
pub use scheduler::{ScheduleSummary, Scheduler};
pub use source::{ChatSink, QuestionSource};
pub use watch::WatchState;
