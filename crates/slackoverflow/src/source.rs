//! Seams between the sync engine and the remote services.
//!
//! The engine only talks to these traits; production wires in
//! [`stackexchange::Client`] and [`notify::SlackClient`].

use async_trait::async_trait;
use notify::{ChannelError, ChatMessage, PostedMessage, SlackClient};
use stackexchange::{Client, Query, QuestionsEnvelope, Quota};

/// Paged question queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// New `/search/advanced` query with credentials applied.
    fn search_advanced(&self) -> Query;

    /// New `/questions/{ids}` query with credentials applied.
    fn questions(&self, ids: &[i64]) -> Query;

    /// Fetch the current page of `query`, recording `has_more` on its cursor.
    async fn fetch(&self, query: &mut Query) -> Result<QuestionsEnvelope, stackexchange::Error>;

    /// Last reported request quota.
    fn quota(&self) -> Quota;
}

/// Chat message posting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, channel: &str, message: &ChatMessage)
        -> Result<PostedMessage, ChannelError>;

    async fn update(
        &self,
        channel: &str,
        ts: &str,
        message: &ChatMessage,
    ) -> Result<PostedMessage, ChannelError>;
}

#[async_trait]
impl QuestionSource for Client {
    fn search_advanced(&self) -> Query {
        Client::search_advanced(self)
    }

    fn questions(&self, ids: &[i64]) -> Query {
        Client::questions(self, ids)
    }

    async fn fetch(&self, query: &mut Query) -> Result<QuestionsEnvelope, stackexchange::Error> {
        Client::fetch(self, query).await
    }

    fn quota(&self) -> Quota {
        Client::quota(self)
    }
}

#[async_trait]
impl ChatSink for SlackClient {
    async fn post(
        &self,
        channel: &str,
        message: &ChatMessage,
    ) -> Result<PostedMessage, ChannelError> {
        self.post_message(channel, message).await
    }

    async fn update(
        &self,
        channel: &str,
        ts: &str,
        message: &ChatMessage,
    ) -> Result<PostedMessage, ChannelError> {
        self.update_message(channel, ts, message).await
    }
}
